//! JSON dictionary exporter: a pretty-printed array of entries.

use crate::adapters::export::entries;
use crate::domain::error::FinmetricsError;
use crate::domain::registry::MetricRegistry;
use crate::ports::export_port::ExportPort;

pub struct JsonExporter;

impl ExportPort for JsonExporter {
    fn render(&self, registry: &MetricRegistry) -> Result<String, FinmetricsError> {
        serde_json::to_string_pretty(&entries(registry)).map_err(|e| FinmetricsError::Export {
            reason: format!("JSON serialisation failed: {}", e),
        })
    }
}
