//! Plan execution.
//!
//! Walks a [`Plan`] once, front to back. Values computed so far live in a
//! per-call memo, so a metric shared by several dependents is computed once.
//! Nothing is cached across calls.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use tracing::debug;

use crate::domain::dataset::FinancialDataset;
use crate::domain::error::MetricError;
use crate::domain::formula::{is_raw_key, Formula};
use crate::domain::metric::{MetricDefinition, MetricKind, Unit};
use crate::domain::planner::{Plan, StepSource};
use crate::domain::registry::MetricRegistry;
use crate::domain::validator;

/// Outcome of one metric query: a value or a structured failure.
pub type EvaluationResult = Result<MetricValue, MetricError>;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricValue {
    pub metric_id: String,
    pub value: f64,
    pub unit: Unit,
    /// Raw dataset values the plan read, by key.
    pub inputs_used: BTreeMap<String, f64>,
    /// Every plan step with its value, in evaluation order.
    pub trace: Vec<TraceStep>,
}

impl MetricValue {
    pub fn formatted(&self) -> String {
        self.unit.format_value(self.value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceStep {
    pub id: String,
    pub value: f64,
    pub source: StepSource,
}

fn formula_for<'d>(def: &'d MetricDefinition, source: &StepSource) -> Option<&'d Formula> {
    match (&def.kind, source) {
        (MetricKind::Derived { formula }, StepSource::Formula) => Some(formula),
        (MetricKind::Direct { fallback, .. }, StepSource::Fallback) => fallback.as_ref(),
        _ => None,
    }
}

/// Execute `plan` against `dataset`.
///
/// All missing raw keys are reported together before any arithmetic runs.
pub fn evaluate(registry: &MetricRegistry, plan: &Plan, dataset: &FinancialDataset) -> EvaluationResult {
    validator::ensure_inputs(plan, dataset)?;

    let mut memo: HashMap<&str, f64> = HashMap::with_capacity(plan.steps.len());
    let mut trace = Vec::with_capacity(plan.steps.len());

    for step in &plan.steps {
        let def = registry.get(&step.id)?;
        let invalid = |reason: String| MetricError::InvalidOperation {
            metric_id: step.id.clone(),
            reason,
        };

        let value = match &step.source {
            StepSource::Field(field) => {
                let value = dataset.get(field).ok_or_else(|| MetricError::MissingRequiredInput {
                    metric_id: plan.target.clone(),
                    missing: [field.clone()].into(),
                })?;
                if !value.is_finite() {
                    return Err(invalid(format!("non-finite value for '{field}'")));
                }
                value
            }
            source => {
                let formula = formula_for(def, source)
                    .ok_or_else(|| invalid("plan step does not match its definition".to_string()))?;
                let lookup = |name: &str| {
                    if is_raw_key(name) {
                        dataset.get(name)
                    } else {
                        memo.get(name).copied()
                    }
                };
                formula.eval(&lookup).map_err(|e| invalid(e.to_string()))?
            }
        };

        debug!(metric = %step.id, value, "evaluated step");
        memo.insert(step.id.as_str(), value);
        trace.push(TraceStep {
            id: step.id.clone(),
            value,
            source: step.source.clone(),
        });
    }

    let target = registry.get(&plan.target)?;
    let value = memo
        .get(plan.target.as_str())
        .copied()
        .ok_or_else(|| MetricError::InvalidOperation {
            metric_id: plan.target.clone(),
            reason: "plan does not compute its target".to_string(),
        })?;

    let inputs_used = plan
        .raw_inputs()
        .into_iter()
        .filter_map(|k| dataset.get(&k).map(|v| (k, v)))
        .collect();

    Ok(MetricValue {
        metric_id: target.id.clone(),
        value,
        unit: target.unit,
        inputs_used,
        trace,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::planner;
    use approx::assert_relative_eq;

    fn run(id: &str, data: &FinancialDataset) -> EvaluationResult {
        let registry = MetricRegistry::standard().unwrap();
        let plan = planner::plan(&registry, id, data)?;
        evaluate(&registry, &plan, data)
    }

    #[test]
    fn gross_profit_from_components() {
        let data = FinancialDataset::from_values([("is.NetRevenue", 100.0), ("is.CostOfRevenue", 60.0)]);
        let result = run("gross_profit", &data).unwrap();
        assert_relative_eq!(result.value, 40.0);
        assert_eq!(result.unit, Unit::Currency);
        assert_eq!(result.inputs_used.len(), 2);
        assert_eq!(result.trace.last().map(|t| t.source.clone()), Some(StepSource::Fallback));
    }

    #[test]
    fn reported_value_used_verbatim() {
        let data = FinancialDataset::from_values([
            ("is.GrossProfit", 41.5),
            ("is.NetRevenue", 100.0),
            ("is.CostOfRevenue", 60.0),
        ]);
        let result = run("gross_profit", &data).unwrap();
        assert_eq!(result.value, 41.5);
        assert_eq!(result.trace.len(), 1);
    }

    #[test]
    fn percent_stays_decimal() {
        let data = FinancialDataset::from_values([("is.NetIncome", 10.0), ("bs.TotalEquity", 100.0)]);
        let result = run("roe_pct", &data).unwrap();
        assert_relative_eq!(result.value, 0.10);
        assert_eq!(result.formatted(), "10.00%");
    }

    #[test]
    fn division_by_zero_is_invalid_operation() {
        let data = FinancialDataset::from_values([("is.NetIncome", 10.0), ("is.NetRevenue", 0.0)]);
        let err = run("net_margin_pct", &data).unwrap_err();
        match err {
            MetricError::InvalidOperation { metric_id, reason } => {
                assert_eq!(metric_id, "net_margin_pct");
                assert!(reason.contains("net_income / revenue"), "{reason}");
            }
            other => panic!("expected invalid operation, got {other:?}"),
        }
    }

    #[test]
    fn missing_optional_component_is_missing_input() {
        let data = FinancialDataset::from_values([("is.OperatingIncome", 50.0)]);
        let err = run("ebitda", &data).unwrap_err();
        let expected: std::collections::BTreeSet<String> = ["is.D&A".to_string()].into();
        assert_eq!(err.missing_inputs(), Some(&expected));
    }

    #[test]
    fn non_finite_input_is_rejected() {
        let data = FinancialDataset::from_values([("is.NetRevenue", f64::NAN)]);
        let err = run("revenue", &data).unwrap_err();
        assert_eq!(err.kind(), "invalid_operation");
    }

    #[test]
    fn capex_sign_does_not_matter_for_free_cash_flow() {
        let negative = FinancialDataset::from_values([("cf.CashFromOperations", 113.81), ("cf.CapEx", -11.75)]);
        let positive = FinancialDataset::from_values([("cf.CashFromOperations", 113.81), ("cf.CapEx", 11.75)]);
        let a = run("free_cash_flow", &negative).unwrap();
        let b = run("free_cash_flow", &positive).unwrap();
        assert_relative_eq!(a.value, 102.06, epsilon = 1e-9);
        assert_eq!(a.value, b.value);
    }
}
