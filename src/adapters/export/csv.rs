//! CSV dictionary exporter. List fields are joined with `; `.

use crate::adapters::export::entries;
use crate::domain::error::FinmetricsError;
use crate::domain::registry::MetricRegistry;
use crate::ports::export_port::ExportPort;

const HEADER: [&str; 7] = ["name", "category", "unit", "description", "formula", "aliases", "inputs"];

pub struct CsvExporter;

fn export_err(e: impl std::fmt::Display) -> FinmetricsError {
    FinmetricsError::Export {
        reason: format!("CSV write failed: {}", e),
    }
}

impl ExportPort for CsvExporter {
    fn render(&self, registry: &MetricRegistry) -> Result<String, FinmetricsError> {
        let mut wtr = csv::Writer::from_writer(Vec::new());
        wtr.write_record(HEADER).map_err(export_err)?;

        for entry in entries(registry) {
            wtr.write_record([
                entry.name.as_str(),
                entry.category.as_str(),
                entry.unit.as_str(),
                entry.description.as_str(),
                entry.formula.as_str(),
                entry.aliases.join("; ").as_str(),
                entry.inputs.join("; ").as_str(),
            ])
            .map_err(export_err)?;
        }

        let bytes = wtr.into_inner().map_err(export_err)?;
        String::from_utf8(bytes).map_err(export_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_and_rows() {
        let registry = MetricRegistry::standard().unwrap();
        let text = CsvExporter.render(&registry).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("name,category,unit,description,formula,aliases,inputs"));
        assert_eq!(
            lines.next(),
            Some("revenue,income_statement,currency,Total top-line sales,is.NetRevenue,sales; top_line,is.NetRevenue")
        );
        assert_eq!(text.lines().count(), registry.len() + 1);
    }

    #[test]
    fn fields_with_commas_are_quoted() {
        let registry = MetricRegistry::standard().unwrap();
        let text = CsvExporter.render(&registry).unwrap();
        let sga = text.lines().find(|l| l.starts_with("sga,")).unwrap();
        assert!(sga.contains("\"Selling, general & admin\""));
    }
}
