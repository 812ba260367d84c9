#![allow(dead_code)]

use finmetrics::domain::dataset::FinancialDataset;
use finmetrics::domain::error::FinmetricsError;
use finmetrics::ports::dataset_port::DatasetPort;
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Apple FY2023, USD billions.
pub fn apple_2023() -> FinancialDataset {
    FinancialDataset::from_values([
        ("is.NetRevenue", 383.29),
        ("is.CostOfRevenue", 208.02),
        ("is.RD", 25.16),
        ("is.SG&A", 25.36),
        ("is.OperatingIncome", 109.22),
        ("is.NetIncome", 97.00),
        ("is.D&A", 11.49),
        ("bs.TotalAssets", 355.37),
        ("bs.TotalEquity", 65.02),
        ("cf.CashFromOperations", 113.81),
        ("cf.CapEx", -11.75),
    ])
    .with_company("AAPL")
}

pub const APPLE_CSV: &str = "field,value
is.NetRevenue,383.29
is.CostOfRevenue,208.02
is.NetIncome,97.00
bs.TotalEquity,65.02
cf.CashFromOperations,113.81
cf.CapEx,-11.75
";

pub fn write_temp_file(suffix: &str, content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

/// In-memory dataset source keyed by path.
pub struct MockDatasetPort {
    pub datasets: HashMap<PathBuf, FinancialDataset>,
}

impl MockDatasetPort {
    pub fn new() -> Self {
        Self {
            datasets: HashMap::new(),
        }
    }

    pub fn with_dataset(mut self, path: &str, dataset: FinancialDataset) -> Self {
        self.datasets.insert(PathBuf::from(path), dataset);
        self
    }
}

impl DatasetPort for MockDatasetPort {
    fn load(&self, path: &Path) -> Result<FinancialDataset, FinmetricsError> {
        self.datasets
            .get(path)
            .cloned()
            .ok_or_else(|| FinmetricsError::Dataset {
                path: path.display().to_string(),
                reason: "not found".into(),
            })
    }
}
