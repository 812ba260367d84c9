//! Dependency resolution.
//!
//! Turns a target metric into a [`Plan`]: the metrics to compute, each after
//! everything it depends on. Resolution is a depth-first walk that marks
//! metrics in progress, so a cycle is reported even when the registry was
//! built without graph checks.
//!
//! Direct metrics are leaves when their field is available. Otherwise their
//! fallback formula (if any) is expanded in their place.

use std::collections::{BTreeSet, HashMap};

use serde::Serialize;
use tracing::debug;

use crate::domain::dataset::KeySet;
use crate::domain::error::MetricError;
use crate::domain::formula::Formula;
use crate::domain::metric::{MetricDefinition, MetricKind};
use crate::domain::registry::MetricRegistry;

/// Where a plan step gets its value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepSource {
    /// The reported field, used verbatim.
    Field(String),
    /// The fallback formula of a direct metric whose field is absent.
    Fallback,
    /// A derived metric's formula.
    Formula,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanStep {
    pub id: String,
    pub source: StepSource,
    /// Raw keys this step reads itself (not through other metrics).
    pub raw_inputs: Vec<String>,
    /// Metric ids this step reads.
    pub metric_inputs: Vec<String>,
}

/// Dependency-ordered steps ending with the target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    pub target: String,
    pub steps: Vec<PlanStep>,
}

impl Plan {
    /// Every raw key the plan reads, sorted.
    pub fn raw_inputs(&self) -> BTreeSet<String> {
        self.steps
            .iter()
            .flat_map(|s| s.raw_inputs.iter().cloned())
            .collect()
    }

    pub fn metric_ids(&self) -> impl Iterator<Item = &str> {
        self.steps.iter().map(|s| s.id.as_str())
    }

    /// Raw keys the plan reads that `available` lacks.
    pub fn missing_from(&self, available: &dyn KeySet) -> BTreeSet<String> {
        self.raw_inputs()
            .into_iter()
            .filter(|k| !available.contains_key(k))
            .collect()
    }
}

#[derive(Clone, Copy)]
enum Expansion<'a> {
    /// Choose field or fallback by what the dataset holds.
    Data(&'a dyn KeySet),
    /// Expand everything a metric could ever need.
    Static,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    InProgress,
    Done,
}

struct Planner<'r, 'a> {
    registry: &'r MetricRegistry,
    expansion: Expansion<'a>,
    marks: HashMap<String, Mark>,
    stack: Vec<String>,
    steps: Vec<PlanStep>,
}

impl<'r, 'a> Planner<'r, 'a> {
    fn new(registry: &'r MetricRegistry, expansion: Expansion<'a>) -> Self {
        Self {
            registry,
            expansion,
            marks: HashMap::new(),
            stack: Vec::new(),
            steps: Vec::new(),
        }
    }

    fn visit(&mut self, id: &str, requested_by: Option<&str>) -> Result<(), MetricError> {
        match self.marks.get(id) {
            Some(Mark::Done) => return Ok(()),
            Some(Mark::InProgress) => {
                let start = self.stack.iter().position(|s| s == id).unwrap_or(0);
                let mut cycle = self.stack[start..].to_vec();
                cycle.push(id.to_string());
                return Err(MetricError::CircularDependency { cycle });
            }
            None => {}
        }

        let def = self
            .registry
            .get(id)
            .map_err(|_| MetricError::UnknownMetric {
                name: id.to_string(),
                requested_by: requested_by.map(str::to_string),
            })?;

        self.marks.insert(id.to_string(), Mark::InProgress);
        self.stack.push(id.to_string());

        let step = self.step_for(def);
        for dep in &step.metric_inputs {
            self.visit(dep, Some(id))?;
        }

        self.stack.pop();
        self.marks.insert(id.to_string(), Mark::Done);
        self.steps.push(step);
        Ok(())
    }

    fn step_for(&self, def: &MetricDefinition) -> PlanStep {
        let (source, formula): (StepSource, Option<&Formula>) = match &def.kind {
            MetricKind::Derived { formula } => (StepSource::Formula, Some(formula)),
            MetricKind::Direct { field, fallback } => match (self.expansion, fallback) {
                (_, None) => (StepSource::Field(field.clone()), None),
                (Expansion::Data(available), Some(_)) if available.contains_key(field) => {
                    (StepSource::Field(field.clone()), None)
                }
                (_, Some(formula)) => (StepSource::Fallback, Some(formula)),
            },
        };

        let mut raw_inputs = Vec::new();
        match (&source, &def.kind, self.expansion) {
            (StepSource::Field(field), _, _) => raw_inputs.push(field.clone()),
            (StepSource::Fallback, MetricKind::Direct { field, .. }, Expansion::Static) => {
                raw_inputs.push(field.clone())
            }
            _ => {}
        }
        let mut metric_inputs = Vec::new();
        if let Some(formula) = formula {
            raw_inputs.extend(formula.raw_refs().map(str::to_string));
            metric_inputs.extend(formula.metric_refs().map(str::to_string));
        }

        PlanStep {
            id: def.id.clone(),
            source,
            raw_inputs,
            metric_inputs,
        }
    }
}

fn run(registry: &MetricRegistry, target: &str, expansion: Expansion<'_>) -> Result<Plan, MetricError> {
    let mut planner = Planner::new(registry, expansion);
    planner.visit(target, None)?;
    debug!(
        target,
        steps = planner.steps.len(),
        "planned metric"
    );
    Ok(Plan {
        target: target.to_string(),
        steps: planner.steps,
    })
}

/// Plan `target` (a canonical id) against the keys a dataset provides.
pub fn plan(registry: &MetricRegistry, target: &str, available: &dyn KeySet) -> Result<Plan, MetricError> {
    run(registry, target, Expansion::Data(available))
}

/// Plan `target` as if no field were ever reported: direct metrics with a
/// fallback list both their field and the fallback's inputs.
pub fn static_plan(registry: &MetricRegistry, target: &str) -> Result<Plan, MetricError> {
    run(registry, target, Expansion::Static)
}
