//! Dataset file adapter: CSV (`field,value` rows) and JSON.
//!
//! The format follows the file extension.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use chrono::NaiveDate;
use serde::Deserialize;
use tracing::{info, warn};

use crate::domain::dataset::FinancialDataset;
use crate::domain::error::FinmetricsError;
use crate::domain::formula::is_raw_key;
use crate::ports::dataset_port::DatasetPort;

#[derive(Debug, Deserialize)]
struct DatasetFile {
    company: Option<String>,
    period_end: Option<NaiveDate>,
    values: BTreeMap<String, f64>,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DatasetFileAdapter;

impl DatasetFileAdapter {
    pub fn new() -> Self {
        Self
    }

    pub fn parse_csv(content: &str, source: &str) -> Result<FinancialDataset, FinmetricsError> {
        let err = |reason: String| FinmetricsError::Dataset {
            path: source.to_string(),
            reason,
        };

        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes());

        let headers = rdr
            .headers()
            .map_err(|e| err(format!("CSV parse error: {}", e)))?
            .clone();
        if headers.get(0) != Some("field") || headers.get(1) != Some("value") {
            return Err(err("expected header 'field,value'".into()));
        }

        let mut values = BTreeMap::new();
        for result in rdr.records() {
            let record = result.map_err(|e| err(format!("CSV parse error: {}", e)))?;
            let line = record.position().map(|p| p.line()).unwrap_or(0);

            let field = record
                .get(0)
                .filter(|f| !f.is_empty())
                .ok_or_else(|| err(format!("line {}: missing field", line)))?;
            let raw = record
                .get(1)
                .ok_or_else(|| err(format!("line {}: missing value for '{}'", line, field)))?;
            let value: f64 = raw
                .parse()
                .map_err(|_| err(format!("line {}: invalid value '{}' for '{}'", line, raw, field)))?;

            if values.insert(field.to_string(), value).is_some() {
                return Err(err(format!("line {}: duplicate field '{}'", line, field)));
            }
        }

        Ok(FinancialDataset::from_values(values))
    }

    pub fn parse_json(content: &str, source: &str) -> Result<FinancialDataset, FinmetricsError> {
        let file: DatasetFile = serde_json::from_str(content).map_err(|e| FinmetricsError::Dataset {
            path: source.to_string(),
            reason: format!("JSON parse error: {}", e),
        })?;

        let mut dataset = FinancialDataset::from_values(file.values);
        if let Some(company) = &file.company {
            dataset = dataset.with_company(company);
        }
        if let Some(period_end) = file.period_end {
            dataset = dataset.with_period_end(period_end);
        }
        Ok(dataset)
    }
}

impl DatasetPort for DatasetFileAdapter {
    fn load(&self, path: &Path) -> Result<FinancialDataset, FinmetricsError> {
        let source = path.display().to_string();
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase);

        let parse: fn(&str, &str) -> Result<FinancialDataset, FinmetricsError> = match extension.as_deref() {
            Some("csv") => Self::parse_csv,
            Some("json") => Self::parse_json,
            _ => {
                return Err(FinmetricsError::Dataset {
                    path: source,
                    reason: "unsupported dataset format (expected .csv or .json)".into(),
                });
            }
        };

        let content = fs::read_to_string(path).map_err(|e| FinmetricsError::Dataset {
            path: source.clone(),
            reason: format!("failed to read: {}", e),
        })?;
        let dataset = parse(&content, &source)?;

        for key in dataset.keys().filter(|k| !is_raw_key(k)) {
            warn!(path = %source, key, "dataset key has no statement prefix and will never be read");
        }
        info!(path = %source, fields = dataset.len(), "loaded dataset");
        Ok(dataset)
    }
}
