//! Custom metric definitions from INI files.
//!
//! ```ini
//! [metric.adjusted_ebitda]
//! category = income_statement
//! unit = currency
//! description = EBITDA before stock compensation
//! formula = ebitda + is.StockCompensation
//! aliases = adj_ebitda
//! ```
//!
//! Direct metrics use `field` (plus an optional `fallback` formula) instead
//! of `formula`. Sections are read in sorted order.

use std::path::Path;

use tracing::info;

use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::catalog;
use crate::domain::error::FinmetricsError;
use crate::domain::metric::{Category, MetricSpec, Unit};
use crate::domain::registry::{MetricRegistry, RegistryBuilder};
use crate::ports::config_port::ConfigPort;

const SECTION_PREFIX: &str = "metric.";

pub fn load_definitions(path: &Path) -> Result<Vec<MetricSpec>, FinmetricsError> {
    let source = path.display().to_string();
    let config = FileConfigAdapter::from_file(path).map_err(|e| FinmetricsError::Definitions {
        path: source.clone(),
        reason: e.to_string(),
    })?;
    let specs = parse_definitions(&config, &source)?;
    info!(path = %source, metrics = specs.len(), "loaded custom metric definitions");
    Ok(specs)
}

pub fn parse_definitions(config: &dyn ConfigPort, source: &str) -> Result<Vec<MetricSpec>, FinmetricsError> {
    let mut sections = config.sections();
    sections.sort();

    sections
        .iter()
        .filter(|s| s.as_str() != "default")
        .map(|section| parse_section(config, section, source))
        .collect()
}

fn parse_section(config: &dyn ConfigPort, section: &str, source: &str) -> Result<MetricSpec, FinmetricsError> {
    let err = |reason: String| FinmetricsError::Definitions {
        path: source.to_string(),
        reason: format!("[{}] {}", section, reason),
    };

    let id = section
        .strip_prefix(SECTION_PREFIX)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| err(format!("section names must look like '{}<id>'", SECTION_PREFIX)))?;
    let required = |key: &str| config.get_string(section, key).ok_or_else(|| err(format!("missing '{}'", key)));

    let category: Category = required("category")?.parse().map_err(err)?;
    let unit: Unit = required("unit")?.parse().map_err(err)?;
    let description = config.get_string(section, "description").unwrap_or_default();

    let field = config.get_string(section, "field");
    let formula = config.get_string(section, "formula");
    let spec = match (field, formula) {
        (Some(field), None) => {
            let spec = MetricSpec::direct(id, category, unit, &field, &description);
            match config.get_string(section, "fallback") {
                Some(fallback) => spec.fallback(&fallback),
                None => spec,
            }
        }
        (None, Some(formula)) => {
            if config.get_string(section, "fallback").is_some() {
                return Err(err("'fallback' is only valid with 'field'".into()));
            }
            MetricSpec::derived(id, category, unit, &formula, &description)
        }
        (Some(_), Some(_)) => return Err(err("set either 'field' or 'formula', not both".into())),
        (None, None) => return Err(err("missing 'field' or 'formula'".into())),
    };

    let aliases = config.get_list(section, "aliases");
    let aliases: Vec<&str> = aliases.iter().map(String::as_str).collect();
    Ok(spec.aliases(&aliases))
}

/// The standard catalogue followed by `custom`, validated as one registry.
pub fn build_registry(custom: Vec<MetricSpec>) -> Result<MetricRegistry, FinmetricsError> {
    let registry = RegistryBuilder::new()
        .extend(catalog::standard_metrics())
        .extend(custom)
        .build()?;
    Ok(registry)
}
