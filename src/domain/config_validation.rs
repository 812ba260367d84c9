//! Configuration validation.
//!
//! Validates every known key before any command runs. Absent keys are fine;
//! present keys must hold a usable value.

use crate::domain::error::FinmetricsError;
use crate::ports::config_port::ConfigPort;
use crate::ports::export_port::ExportFormat;

pub const LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

pub fn validate_config(config: &dyn ConfigPort) -> Result<(), FinmetricsError> {
    validate_definitions(config)?;
    validate_export_format(config)?;
    validate_log_level(config)?;
    Ok(())
}

fn validate_definitions(config: &dyn ConfigPort) -> Result<(), FinmetricsError> {
    // A [registry] section exists only to name a definitions file.
    let has_section = config.sections().iter().any(|s| s == "registry");
    if has_section && config.get_string("registry", "definitions").is_none() {
        return Err(FinmetricsError::ConfigMissing {
            section: "registry".to_string(),
            key: "definitions".to_string(),
        });
    }
    Ok(())
}

fn validate_export_format(config: &dyn ConfigPort) -> Result<(), FinmetricsError> {
    if let Some(value) = config.get_string("export", "format") {
        value
            .parse::<ExportFormat>()
            .map_err(|_| FinmetricsError::ConfigInvalid {
                section: "export".to_string(),
                key: "format".to_string(),
                reason: format!("format must be one of: {}", ExportFormat::NAMES.join(", ")),
            })?;
    }
    Ok(())
}

fn validate_log_level(config: &dyn ConfigPort) -> Result<(), FinmetricsError> {
    if let Some(value) = config.get_string("logging", "level") {
        if !LOG_LEVELS.contains(&value.to_lowercase().as_str()) {
            return Err(FinmetricsError::ConfigInvalid {
                section: "logging".to_string(),
                key: "level".to_string(),
                reason: format!("level must be one of: {}", LOG_LEVELS.join(", ")),
            });
        }
    }
    Ok(())
}
