//! Metrics dictionary export port trait.

use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use crate::domain::error::FinmetricsError;
use crate::domain::registry::MetricRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
    Markdown,
}

impl ExportFormat {
    pub const NAMES: [&'static str; 3] = ["json", "csv", "markdown"];

    pub fn as_str(self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
            ExportFormat::Markdown => "markdown",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportFormat {
    type Err = FinmetricsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "csv" => Ok(ExportFormat::Csv),
            "markdown" | "md" => Ok(ExportFormat::Markdown),
            other => Err(FinmetricsError::Export {
                reason: format!(
                    "unsupported format '{}' (expected one of: {})",
                    other,
                    Self::NAMES.join(", ")
                ),
            }),
        }
    }
}

/// Port for serialising the metric catalogue.
pub trait ExportPort {
    fn render(&self, registry: &MetricRegistry) -> Result<String, FinmetricsError>;

    /// Default implementation: renders, then writes the text to `output_path`.
    fn write(&self, registry: &MetricRegistry, output_path: &Path) -> Result<(), FinmetricsError> {
        let content = self.render(registry)?;
        fs::write(output_path, content)?;
        Ok(())
    }
}
