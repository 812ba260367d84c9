//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::adapters::dataset_file_adapter::DatasetFileAdapter;
use crate::adapters::definitions_file_adapter::{build_registry, load_definitions};
use crate::adapters::export::export_metrics_dictionary;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::config_validation::validate_config;
use crate::domain::dataset::FinancialDataset;
use crate::domain::error::{FinmetricsError, MetricError};
use crate::domain::evaluator::EvaluationResult;
use crate::domain::interpreter::MetricsInterpreter;
use crate::domain::metric::{Category, MetricDefinition};
use crate::domain::query::identify_metrics;
use crate::domain::registry::MetricRegistry;
use crate::ports::config_port::ConfigPort;
use crate::ports::dataset_port::DatasetPort;
use crate::ports::export_port::ExportFormat;

const DEFAULT_LOG_LEVEL: &str = "warn";

#[derive(Parser, Debug)]
#[command(name = "finmetrics", about = "Financial metrics interpreter")]
pub struct Cli {
    /// INI configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
    /// Log level (error, warn, info, debug, trace); RUST_LOG takes precedence
    #[arg(long, global = true)]
    pub log_level: Option<String>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Calculate one or more metrics from a dataset file
    Calc {
        #[arg(required = true)]
        metrics: Vec<String>,
        #[arg(short, long)]
        data: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// List the raw inputs a dataset lacks for a metric
    Check {
        metric: String,
        #[arg(short, long)]
        data: PathBuf,
    },
    /// List available metrics
    List {
        #[arg(long)]
        category: Option<String>,
    },
    /// Search metrics by keyword
    Search { keyword: String },
    /// Show a metric's requirements
    Info { metric: String },
    /// Export the metrics dictionary
    Export {
        #[arg(short, long)]
        format: Option<String>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Identify metrics mentioned in free text
    Identify {
        text: String,
        #[arg(short, long)]
        data: Option<PathBuf>,
    },
    /// Validate a custom metric definitions file
    Validate {
        #[arg(long)]
        definitions: PathBuf,
    },
}

/// Values resolved from the optional config file.
#[derive(Debug, Default)]
pub struct Settings {
    pub definitions: Option<PathBuf>,
    pub export_format: Option<ExportFormat>,
    pub log_level: Option<String>,
}

pub fn run(cli: Cli) -> ExitCode {
    let settings = match cli.config.as_ref().map(|p| load_settings(p)).transpose() {
        Ok(s) => s.unwrap_or_default(),
        Err(e) => return fail(e),
    };

    let level = cli
        .log_level
        .clone()
        .or_else(|| settings.log_level.clone())
        .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string());
    init_logging(&level);

    if let Command::Validate { definitions } = &cli.command {
        return run_validate(definitions);
    }

    let registry = match load_registry(settings.definitions.as_deref()) {
        Ok(r) => r,
        Err(e) => return fail(e),
    };
    let interp = MetricsInterpreter::new(&registry);

    match cli.command {
        Command::Calc { metrics, data, json } => run_calc(&interp, &metrics, &data, json),
        Command::Check { metric, data } => run_check(&interp, &metric, &data),
        Command::List { category } => run_list(&interp, category.as_deref()),
        Command::Search { keyword } => run_search(&interp, &keyword),
        Command::Info { metric } => run_info(&interp, &metric),
        Command::Export { format, output } => {
            run_export(&registry, format.as_deref(), settings.export_format, output.as_deref())
        }
        Command::Identify { text, data } => run_identify(&interp, &text, data.as_deref()),
        // handled before the registry is built
        Command::Validate { .. } => ExitCode::SUCCESS,
    }
}

/// Install the stderr subscriber. `RUST_LOG` overrides `level`.
pub fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    // A subscriber may already be installed (tests); keep it.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn fail(err: FinmetricsError) -> ExitCode {
    eprintln!("error: {err}");
    ExitCode::from(&err)
}

pub fn load_settings(path: &Path) -> Result<Settings, FinmetricsError> {
    let adapter = FileConfigAdapter::from_file(path).map_err(|e| FinmetricsError::ConfigParse {
        file: path.display().to_string(),
        reason: e.to_string(),
    })?;
    validate_config(&adapter)?;
    build_settings(&adapter, path.parent())
}

/// Relative definitions paths resolve against the config file's directory.
pub fn build_settings(config: &dyn ConfigPort, base_dir: Option<&Path>) -> Result<Settings, FinmetricsError> {
    let definitions = config.get_string("registry", "definitions").map(|d| {
        let path = PathBuf::from(d);
        match base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path,
        }
    });
    let export_format = config
        .get_string("export", "format")
        .map(|f| f.parse::<ExportFormat>())
        .transpose()?;
    let log_level = config.get_string("logging", "level").map(|l| l.to_lowercase());

    Ok(Settings {
        definitions,
        export_format,
        log_level,
    })
}

pub fn load_registry(definitions: Option<&Path>) -> Result<MetricRegistry, FinmetricsError> {
    let registry = match definitions {
        Some(path) => build_registry(load_definitions(path)?)?,
        None => MetricRegistry::standard()?,
    };
    info!(metrics = registry.len(), "registry ready");
    Ok(registry)
}

fn load_dataset(path: &Path) -> Result<FinancialDataset, FinmetricsError> {
    DatasetFileAdapter::new().load(path)
}

fn result_json(name: &str, result: &EvaluationResult) -> serde_json::Value {
    match result {
        Ok(value) => json!({
            "name": name,
            "metric_id": value.metric_id,
            "value": value.value,
            "unit": value.unit,
            "formatted": value.formatted(),
            "inputs_used": value.inputs_used,
            "trace": value.trace,
        }),
        Err(err) => json!({
            "name": name,
            "error": {
                "kind": err.kind(),
                "message": err.to_string(),
                "missing_inputs": err.missing_inputs(),
            },
        }),
    }
}

fn run_calc(interp: &MetricsInterpreter<'_>, metrics: &[String], data: &Path, as_json: bool) -> ExitCode {
    let dataset = match load_dataset(data) {
        Ok(d) => d,
        Err(e) => return fail(e),
    };

    let results = interp.calculate_metrics(metrics, &dataset);
    let first_failure = results.iter().find_map(|(_, r)| r.as_ref().err()).cloned();

    if as_json {
        let rows: Vec<serde_json::Value> = results.iter().map(|(n, r)| result_json(n, r)).collect();
        match serde_json::to_string_pretty(&rows) {
            Ok(text) => println!("{text}"),
            Err(e) => {
                return fail(FinmetricsError::Export {
                    reason: e.to_string(),
                })
            }
        }
    } else {
        for (name, result) in &results {
            match result {
                Ok(value) => println!("{}: {}", value.metric_id, value.formatted()),
                Err(err) => eprintln!("error: {name}: {err}"),
            }
        }
    }

    match first_failure {
        Some(err) => ExitCode::from(&FinmetricsError::from(err)),
        None => ExitCode::SUCCESS,
    }
}

fn run_check(interp: &MetricsInterpreter<'_>, metric: &str, data: &Path) -> ExitCode {
    let dataset = match load_dataset(data) {
        Ok(d) => d,
        Err(e) => return fail(e),
    };
    let id = match interp.get_metric_definition(metric) {
        Ok(lookup) => lookup.definition.id.clone(),
        Err(e) => return fail(e.into()),
    };

    match interp.missing_inputs(&id, &dataset) {
        Ok(missing) if missing.is_empty() => {
            println!("{id}: all inputs present");
            ExitCode::SUCCESS
        }
        Ok(missing) => {
            println!("{id}: missing {} input(s)", missing.len());
            for key in &missing {
                println!("  {key}");
            }
            ExitCode::from(&FinmetricsError::from(MetricError::MissingRequiredInput {
                metric_id: id,
                missing,
            }))
        }
        Err(e) => fail(e.into()),
    }
}

fn print_definitions(defs: &[&MetricDefinition]) {
    for def in defs {
        println!(
            "{:<32} {:<17} {:<9} {}",
            def.id,
            def.category.as_str(),
            def.unit.as_str(),
            def.description
        );
    }
}

fn run_list(interp: &MetricsInterpreter<'_>, category: Option<&str>) -> ExitCode {
    let category = match category.map(str::parse::<Category>).transpose() {
        Ok(c) => c,
        Err(reason) => {
            eprintln!("error: {reason}");
            return ExitCode::from(2);
        }
    };
    print_definitions(&interp.list_available_metrics(category));
    ExitCode::SUCCESS
}

fn run_search(interp: &MetricsInterpreter<'_>, keyword: &str) -> ExitCode {
    let found = interp.find_metrics_by_keyword(keyword);
    if found.is_empty() {
        eprintln!("no metrics match '{keyword}'");
    }
    print_definitions(&found);
    ExitCode::SUCCESS
}

fn run_info(interp: &MetricsInterpreter<'_>, metric: &str) -> ExitCode {
    let requirements = match interp.get_metric_requirements(metric) {
        Ok(r) => r,
        Err(e) => return fail(e.into()),
    };
    match serde_json::to_string_pretty(&requirements) {
        Ok(text) => {
            println!("{text}");
            ExitCode::SUCCESS
        }
        Err(e) => fail(FinmetricsError::Export {
            reason: e.to_string(),
        }),
    }
}

fn run_export(
    registry: &MetricRegistry,
    format: Option<&str>,
    configured: Option<ExportFormat>,
    output: Option<&Path>,
) -> ExitCode {
    let format = match format.map(str::parse::<ExportFormat>).transpose() {
        Ok(f) => f.or(configured).unwrap_or(ExportFormat::Json),
        Err(e) => return fail(e),
    };

    match export_metrics_dictionary(registry, format, output) {
        Ok(Some(text)) => {
            print!("{text}");
            if !text.ends_with('\n') {
                println!();
            }
            ExitCode::SUCCESS
        }
        Ok(None) => ExitCode::SUCCESS,
        Err(e) => fail(e),
    }
}

fn run_identify(interp: &MetricsInterpreter<'_>, text: &str, data: Option<&Path>) -> ExitCode {
    let ids = identify_metrics(interp.registry(), text);
    if ids.is_empty() {
        eprintln!("no metrics identified");
        return ExitCode::SUCCESS;
    }

    let Some(path) = data else {
        for id in &ids {
            println!("{id}");
        }
        return ExitCode::SUCCESS;
    };

    let dataset = match load_dataset(path) {
        Ok(d) => d,
        Err(e) => return fail(e),
    };
    for (id, result) in interp.calculate_metrics(&ids, &dataset) {
        match result {
            Ok(value) => println!("{id}: {}", value.formatted()),
            Err(err) => println!("{id}: unavailable ({err})"),
        }
    }
    ExitCode::SUCCESS
}

fn run_validate(definitions: &Path) -> ExitCode {
    info!(path = %definitions.display(), "validating definitions");
    let custom = match load_definitions(definitions) {
        Ok(specs) => specs,
        Err(e) => return fail(e),
    };
    let custom_count = custom.len();
    match build_registry(custom) {
        Ok(registry) => {
            println!(
                "ok: {} metrics ({} custom)",
                registry.len(),
                custom_count
            );
            ExitCode::SUCCESS
        }
        Err(e) => fail(e),
    }
}
