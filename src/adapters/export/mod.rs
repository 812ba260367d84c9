//! Metrics dictionary export.
//!
//! Every exporter renders the same [`DictionaryEntry`] rows, in registry
//! order, so output is deterministic for a given registry.

pub mod csv;
pub mod json;
pub mod markdown;

use std::path::Path;

use serde::Serialize;
use tracing::info;

use crate::domain::error::FinmetricsError;
use crate::domain::metric::{Category, MetricDefinition, Unit};
use crate::domain::registry::MetricRegistry;
use crate::ports::export_port::{ExportFormat, ExportPort};

/// One exported metric.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DictionaryEntry {
    pub name: String,
    pub category: Category,
    pub unit: Unit,
    pub description: String,
    pub formula: String,
    pub aliases: Vec<String>,
    pub inputs: Vec<String>,
}

impl From<&MetricDefinition> for DictionaryEntry {
    fn from(def: &MetricDefinition) -> Self {
        Self {
            name: def.id.clone(),
            category: def.category,
            unit: def.unit,
            description: def.description.clone(),
            formula: def.formula_text(),
            aliases: def.aliases.clone(),
            inputs: def.requires().into_iter().map(str::to_string).collect(),
        }
    }
}

pub fn entries(registry: &MetricRegistry) -> Vec<DictionaryEntry> {
    registry.all().iter().map(DictionaryEntry::from).collect()
}

pub fn exporter_for(format: ExportFormat) -> Box<dyn ExportPort> {
    match format {
        ExportFormat::Json => Box::new(json::JsonExporter),
        ExportFormat::Csv => Box::new(csv::CsvExporter),
        ExportFormat::Markdown => Box::new(markdown::MarkdownExporter),
    }
}

/// Render the dictionary. With a destination the text is written there and
/// `None` is returned; otherwise the text is returned.
pub fn export_metrics_dictionary(
    registry: &MetricRegistry,
    format: ExportFormat,
    destination: Option<&Path>,
) -> Result<Option<String>, FinmetricsError> {
    let exporter = exporter_for(format);
    match destination {
        Some(path) => {
            exporter.write(registry, path)?;
            info!(format = %format, path = %path.display(), "exported metrics dictionary");
            Ok(None)
        }
        None => exporter.render(registry).map(Some),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_lists_formula_and_inputs() {
        let registry = MetricRegistry::standard().unwrap();
        let entry = DictionaryEntry::from(registry.get("gross_profit").unwrap());
        assert_eq!(entry.formula, "is.GrossProfit (else revenue - cogs)");
        assert_eq!(entry.inputs, vec!["is.GrossProfit", "revenue", "cogs"]);
        assert_eq!(entry.aliases, vec!["gross_income"]);
    }

    #[test]
    fn writes_to_destination() {
        let registry = MetricRegistry::standard().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metrics.md");
        let returned = export_metrics_dictionary(&registry, ExportFormat::Markdown, Some(&path)).unwrap();
        assert!(returned.is_none());
        let written = std::fs::read_to_string(&path).unwrap();
        let rendered = export_metrics_dictionary(&registry, ExportFormat::Markdown, None)
            .unwrap()
            .unwrap();
        assert_eq!(written, rendered);
    }

    #[test]
    fn write_to_missing_directory_fails() {
        let registry = MetricRegistry::standard().unwrap();
        let path = Path::new("/nonexistent/dir/metrics.json");
        let err = export_metrics_dictionary(&registry, ExportFormat::Json, Some(path)).unwrap_err();
        assert!(matches!(err, FinmetricsError::Io(_)));
    }
}
