//! Pre-flight input checks.
//!
//! Every missing raw key is collected before any arithmetic runs, so a caller
//! learns all of what to supply in one round trip.

use std::collections::BTreeSet;

use crate::domain::dataset::KeySet;
use crate::domain::error::MetricError;
use crate::domain::planner::{self, Plan};
use crate::domain::registry::MetricRegistry;

/// Raw keys `target` needs that `available` lacks. Empty when the metric can
/// be computed.
pub fn missing_inputs(
    registry: &MetricRegistry,
    target: &str,
    available: &dyn KeySet,
) -> Result<BTreeSet<String>, MetricError> {
    let plan = planner::plan(registry, target, available)?;
    Ok(plan.missing_from(available))
}

/// Fails with `MissingRequiredInput` naming every absent key of the plan.
pub fn ensure_inputs(plan: &Plan, available: &dyn KeySet) -> Result<(), MetricError> {
    let missing = plan.missing_from(available);
    if missing.is_empty() {
        return Ok(());
    }
    Err(MetricError::MissingRequiredInput {
        metric_id: plan.target.clone(),
        missing,
    })
}
