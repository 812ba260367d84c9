//! Domain error types.

use std::collections::BTreeSet;

/// A parse error with position information for formula parsing.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("parse error at position {position}: {message}")]
pub struct ParseError {
    pub message: String,
    /// Character (not byte) offset into the formula.
    pub position: usize,
}

impl ParseError {
    /// Format the error with a caret pointing at the error position in the input.
    pub fn display_with_context(&self, input: &str) -> String {
        let caret = " ".repeat(self.position) + "^";
        format!(
            "{input}\n{caret}\n{err}",
            input = input,
            caret = caret,
            err = self
        )
    }
}

/// Failure of a single metric query.
///
/// These never escape the interpreter as panics: every query path returns
/// them as the `Err` side of [`EvaluationResult`](crate::domain::evaluator::EvaluationResult).
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MetricError {
    #[error("unknown metric '{name}'{}", requester_suffix(.requested_by))]
    UnknownMetric {
        name: String,
        requested_by: Option<String>,
    },

    #[error("missing required input for '{metric_id}': {}", join_keys(.missing))]
    MissingRequiredInput {
        metric_id: String,
        missing: BTreeSet<String>,
    },

    #[error("circular dependency: {}", .cycle.join(" -> "))]
    CircularDependency { cycle: Vec<String> },

    #[error("invalid operation in '{metric_id}': {reason}")]
    InvalidOperation { metric_id: String, reason: String },
}

impl MetricError {
    pub fn unknown(name: &str) -> Self {
        MetricError::UnknownMetric {
            name: name.to_string(),
            requested_by: None,
        }
    }

    /// Short, stable name of the failure kind.
    pub fn kind(&self) -> &'static str {
        match self {
            MetricError::UnknownMetric { .. } => "unknown_metric",
            MetricError::MissingRequiredInput { .. } => "missing_required_input",
            MetricError::CircularDependency { .. } => "circular_dependency",
            MetricError::InvalidOperation { .. } => "invalid_operation",
        }
    }

    /// The missing raw keys, when the failure is a missing-input failure.
    pub fn missing_inputs(&self) -> Option<&BTreeSet<String>> {
        match self {
            MetricError::MissingRequiredInput { missing, .. } => Some(missing),
            _ => None,
        }
    }
}

fn requester_suffix(requested_by: &Option<String>) -> String {
    match requested_by {
        Some(r) => format!(" (required by '{r}')"),
        None => String::new(),
    }
}

fn join_keys(keys: &BTreeSet<String>) -> String {
    keys.iter().map(String::as_str).collect::<Vec<_>>().join(", ")
}

/// Registry construction failures. A registry that fails any of these checks
/// cannot serve queries, so they are fatal at startup.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RegistryError {
    #[error("duplicate metric id '{0}'")]
    DuplicateMetric(String),

    #[error("name '{name}' on '{metric_id}' collides with '{existing}'")]
    AliasCollision {
        name: String,
        metric_id: String,
        existing: String,
    },

    #[error("circular dependency in registry: {}", .cycle.join(" -> "))]
    CircularDependency { cycle: Vec<String> },

    #[error("metric '{metric_id}' references unknown metric '{reference}'")]
    UnknownReference { metric_id: String, reference: String },

    #[error("invalid formula for '{metric_id}': {source}")]
    InvalidFormula {
        metric_id: String,
        #[source]
        source: ParseError,
    },

    #[error("invalid definition for '{metric_id}': {reason}")]
    InvalidDefinition { metric_id: String, reason: String },
}

/// Top-level error type for finmetrics.
#[derive(Debug, thiserror::Error)]
pub enum FinmetricsError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Metric(#[from] MetricError),

    #[error("dataset error in {path}: {reason}")]
    Dataset { path: String, reason: String },

    #[error("definitions error in {path}: {reason}")]
    Definitions { path: String, reason: String },

    #[error("export error: {reason}")]
    Export { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&FinmetricsError> for std::process::ExitCode {
    fn from(err: &FinmetricsError) -> Self {
        let code: u8 = match err {
            FinmetricsError::Io(_) => 1,
            FinmetricsError::ConfigParse { .. }
            | FinmetricsError::ConfigMissing { .. }
            | FinmetricsError::ConfigInvalid { .. } => 2,
            FinmetricsError::Registry(_) | FinmetricsError::Definitions { .. } => 3,
            FinmetricsError::Metric(_) => 4,
            FinmetricsError::Dataset { .. } => 5,
            FinmetricsError::Export { .. } => 6,
        };
        std::process::ExitCode::from(code)
    }
}
