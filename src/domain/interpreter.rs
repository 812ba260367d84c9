//! Metrics interpreter facade.
//!
//! The public entry point: resolves a name or alias, plans, validates and
//! evaluates. Queries never panic and never mutate the registry or dataset;
//! every failure comes back as a [`MetricError`].

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use tracing::{debug, warn};

use crate::domain::alias::normalize;
use crate::domain::dataset::FinancialDataset;
use crate::domain::error::MetricError;
use crate::domain::evaluator::{self, EvaluationResult};
use crate::domain::metric::{Category, MetricDefinition, Unit};
use crate::domain::planner;
use crate::domain::registry::MetricRegistry;
use crate::domain::validator;

/// What a metric needs, independent of any dataset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricRequirements {
    pub id: String,
    pub category: Category,
    pub unit: Unit,
    pub description: String,
    pub formula: String,
    /// The definition's own requirements, in formula order.
    pub direct_inputs: Vec<String>,
    /// Every raw key anywhere in the chain, sorted.
    pub raw_keys: BTreeSet<String>,
    /// Metrics computed before the target, in evaluation order.
    pub dependency_metrics: Vec<String>,
    /// Raw keys grouped by statement prefix (`is`, `bs`, `cf`, ...).
    pub by_statement: BTreeMap<String, Vec<String>>,
}

/// A definition found by name, noting whether the name was an alias.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricLookup<'r> {
    pub definition: &'r MetricDefinition,
    pub via_alias: bool,
}

fn statement_prefix(key: &str) -> &str {
    key.split('.').next().unwrap_or(key)
}

#[derive(Debug, Clone, Copy)]
pub struct MetricsInterpreter<'r> {
    registry: &'r MetricRegistry,
}

impl<'r> MetricsInterpreter<'r> {
    pub fn new(registry: &'r MetricRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &'r MetricRegistry {
        self.registry
    }

    pub fn calculate_metric(&self, name: &str, dataset: &FinancialDataset) -> EvaluationResult {
        let result = self.try_calculate(name, dataset);
        match &result {
            Ok(value) => debug!(metric = %value.metric_id, value = value.value, "calculated"),
            Err(err) => warn!(metric = name, kind = err.kind(), "calculation failed: {err}"),
        }
        result
    }

    fn try_calculate(&self, name: &str, dataset: &FinancialDataset) -> EvaluationResult {
        let def = self.registry.resolve(name)?;
        let plan = planner::plan(self.registry, &def.id, dataset)?;
        evaluator::evaluate(self.registry, &plan, dataset)
    }

    /// Evaluate each name independently, in request order.
    pub fn calculate_metrics<I, S>(&self, names: I, dataset: &FinancialDataset) -> Vec<(String, EvaluationResult)>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        names
            .into_iter()
            .map(|name| {
                let name = name.as_ref();
                (name.to_string(), self.calculate_metric(name, dataset))
            })
            .collect()
    }

    /// Evaluate every registered metric, in registration order.
    pub fn calculate_all(&self, dataset: &FinancialDataset) -> Vec<(String, EvaluationResult)> {
        self.calculate_metrics(self.registry.all().iter().map(|m| m.id.as_str()), dataset)
    }

    pub fn get_metric_requirements(&self, name: &str) -> Result<MetricRequirements, MetricError> {
        let def = self.registry.resolve(name)?;
        let plan = planner::static_plan(self.registry, &def.id)?;

        let raw_keys = plan.raw_inputs();
        let mut by_statement: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for key in &raw_keys {
            by_statement
                .entry(statement_prefix(key).to_string())
                .or_default()
                .push(key.clone());
        }

        Ok(MetricRequirements {
            id: def.id.clone(),
            category: def.category,
            unit: def.unit,
            description: def.description.clone(),
            formula: def.formula_text(),
            direct_inputs: def.requires().into_iter().map(str::to_string).collect(),
            raw_keys,
            dependency_metrics: plan
                .metric_ids()
                .filter(|id| *id != def.id)
                .map(str::to_string)
                .collect(),
            by_statement,
        })
    }

    /// Raw keys the dataset would need to add for `name` to be computable.
    pub fn missing_inputs(&self, name: &str, dataset: &FinancialDataset) -> Result<BTreeSet<String>, MetricError> {
        let def = self.registry.resolve(name)?;
        validator::missing_inputs(self.registry, &def.id, dataset)
    }

    pub fn get_metric_definition(&self, name: &str) -> Result<MetricLookup<'r>, MetricError> {
        let definition = self.registry.resolve(name)?;
        Ok(MetricLookup {
            definition,
            via_alias: normalize(name) != definition.id,
        })
    }

    pub fn list_available_metrics(&self, category: Option<Category>) -> Vec<&'r MetricDefinition> {
        match category {
            Some(c) => self.registry.by_category(c),
            None => self.registry.all().iter().collect(),
        }
    }

    pub fn find_metrics_by_keyword(&self, keyword: &str) -> Vec<&'r MetricDefinition> {
        self.registry.find_by_keyword(keyword)
    }
}
