//! Metric registry.
//!
//! Built once from [`MetricSpec`]s and immutable afterwards, so a single
//! registry can be shared by reference across threads without locking.
//!
//! # Construction checks
//!
//! - ids are non-empty, lowercase, trimmed and contain no `.`
//! - direct fields are raw keys (contain a `.`)
//! - every formula parses
//! - no duplicate ids; no alias collides with any id or other alias
//! - every metric reference names a registered metric
//! - the requirement graph is acyclic (three-colour DFS; the error carries the cycle)

use std::collections::HashMap;

use tracing::info;

use crate::domain::alias::{normalize, AliasResolver};
use crate::domain::catalog;
use crate::domain::error::{MetricError, RegistryError};
use crate::domain::formula::{is_raw_key, Formula};
use crate::domain::metric::{Category, MetricDefinition, MetricKind, MetricSpec, SpecSource};

#[derive(Debug, Default)]
pub struct RegistryBuilder {
    specs: Vec<MetricSpec>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(mut self, spec: MetricSpec) -> Self {
        self.specs.push(spec);
        self
    }

    pub fn extend<I: IntoIterator<Item = MetricSpec>>(mut self, specs: I) -> Self {
        self.specs.extend(specs);
        self
    }

    pub fn build(self) -> Result<MetricRegistry, RegistryError> {
        let registry = self.assemble()?;
        check_references(&registry.metrics, &registry.index)?;
        check_acyclic(&registry.metrics, &registry.index)?;
        info!(
            metrics = registry.metrics.len(),
            names = registry.resolver.len(),
            "metric registry built"
        );
        Ok(registry)
    }

    /// Build without the reference and cycle checks. Lookup tables still
    /// require unique names, so those checks always run.
    pub fn build_unchecked_graph(self) -> Result<MetricRegistry, RegistryError> {
        self.assemble()
    }

    fn assemble(self) -> Result<MetricRegistry, RegistryError> {
        let mut metrics = Vec::with_capacity(self.specs.len());
        let mut index = HashMap::with_capacity(self.specs.len());
        let mut resolver = AliasResolver::new();

        for spec in self.specs {
            let def = compile(spec)?;

            if index.contains_key(&def.id) {
                return Err(RegistryError::DuplicateMetric(def.id));
            }
            resolver
                .insert(&def.id, &def.id)
                .map_err(|existing| RegistryError::AliasCollision {
                    name: def.id.clone(),
                    metric_id: def.id.clone(),
                    existing,
                })?;
            for alias in &def.aliases {
                resolver
                    .insert(alias, &def.id)
                    .map_err(|existing| RegistryError::AliasCollision {
                        name: alias.clone(),
                        metric_id: def.id.clone(),
                        existing,
                    })?;
            }

            index.insert(def.id.clone(), metrics.len());
            metrics.push(def);
        }

        Ok(MetricRegistry {
            metrics,
            index,
            resolver,
        })
    }
}

fn compile(spec: MetricSpec) -> Result<MetricDefinition, RegistryError> {
    let invalid = |reason: &str| RegistryError::InvalidDefinition {
        metric_id: spec.id.clone(),
        reason: reason.to_string(),
    };

    if spec.id.is_empty() {
        return Err(invalid("id must not be empty"));
    }
    if normalize(&spec.id) != spec.id {
        return Err(invalid("id must be lowercase without surrounding whitespace"));
    }
    if is_raw_key(&spec.id) {
        return Err(invalid("id must not contain '.'"));
    }
    if spec.aliases.iter().any(|a| normalize(a).is_empty()) {
        return Err(invalid("aliases must not be empty"));
    }

    let parse = |source: &str| {
        Formula::parse(source).map_err(|e| RegistryError::InvalidFormula {
            metric_id: spec.id.clone(),
            source: e,
        })
    };

    let kind = match &spec.source {
        SpecSource::Direct { field, fallback } => {
            if !is_raw_key(field) {
                return Err(invalid("direct field must be a raw key such as 'is.NetRevenue'"));
            }
            MetricKind::Direct {
                field: field.clone(),
                fallback: fallback.as_deref().map(parse).transpose()?,
            }
        }
        SpecSource::Derived { formula } => MetricKind::Derived {
            formula: parse(formula)?,
        },
    };

    Ok(MetricDefinition {
        id: spec.id,
        category: spec.category,
        unit: spec.unit,
        description: spec.description,
        kind,
        aliases: spec.aliases,
    })
}

fn check_references(
    metrics: &[MetricDefinition],
    index: &HashMap<String, usize>,
) -> Result<(), RegistryError> {
    for def in metrics {
        if let Some(unknown) = def
            .metric_dependencies()
            .into_iter()
            .find(|dep| !index.contains_key(*dep))
        {
            return Err(RegistryError::UnknownReference {
                metric_id: def.id.clone(),
                reference: unknown.to_string(),
            });
        }
    }
    Ok(())
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum VisitState {
    Unvisited,
    InProgress,
    Done,
}

fn check_acyclic(
    metrics: &[MetricDefinition],
    index: &HashMap<String, usize>,
) -> Result<(), RegistryError> {
    let mut state = vec![VisitState::Unvisited; metrics.len()];
    let mut path = Vec::new();

    for i in 0..metrics.len() {
        if state[i] == VisitState::Unvisited {
            visit(i, metrics, index, &mut state, &mut path)?;
        }
    }
    Ok(())
}

fn visit(
    node: usize,
    metrics: &[MetricDefinition],
    index: &HashMap<String, usize>,
    state: &mut Vec<VisitState>,
    path: &mut Vec<usize>,
) -> Result<(), RegistryError> {
    match state[node] {
        VisitState::Done => return Ok(()),
        VisitState::InProgress => {
            let start = path.iter().position(|&n| n == node).unwrap_or(0);
            let mut cycle: Vec<String> = path[start..].iter().map(|&n| metrics[n].id.clone()).collect();
            cycle.push(metrics[node].id.clone());
            return Err(RegistryError::CircularDependency { cycle });
        }
        VisitState::Unvisited => state[node] = VisitState::InProgress,
    }

    path.push(node);
    for dep in metrics[node].metric_dependencies() {
        if let Some(&child) = index.get(dep) {
            visit(child, metrics, index, state, path)?;
        }
    }
    path.pop();

    state[node] = VisitState::Done;
    Ok(())
}

/// Immutable catalogue of metric definitions, in registration order.
#[derive(Debug, Clone)]
pub struct MetricRegistry {
    metrics: Vec<MetricDefinition>,
    index: HashMap<String, usize>,
    resolver: AliasResolver,
}

impl MetricRegistry {
    /// The built-in catalogue.
    pub fn standard() -> Result<Self, RegistryError> {
        RegistryBuilder::new()
            .extend(catalog::standard_metrics())
            .build()
    }

    /// Look up by canonical id only.
    pub fn get(&self, id: &str) -> Result<&MetricDefinition, MetricError> {
        self.index
            .get(id)
            .map(|&i| &self.metrics[i])
            .ok_or_else(|| MetricError::unknown(id))
    }

    /// Look up by canonical id or alias, case-insensitively.
    pub fn resolve(&self, name: &str) -> Result<&MetricDefinition, MetricError> {
        let canonical = self
            .resolver
            .resolve(name)
            .ok_or_else(|| MetricError::unknown(name.trim()))?;
        self.get(canonical)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn all(&self) -> &[MetricDefinition] {
        &self.metrics
    }

    pub fn by_category(&self, category: Category) -> Vec<&MetricDefinition> {
        self.metrics.iter().filter(|m| m.category == category).collect()
    }

    pub fn find_by_keyword(&self, keyword: &str) -> Vec<&MetricDefinition> {
        self.metrics.iter().filter(|m| m.matches_keyword(keyword)).collect()
    }

    /// Every alias, paired with its canonical id, in registration order.
    pub fn aliases(&self) -> impl Iterator<Item = (&str, &str)> {
        self.metrics
            .iter()
            .flat_map(|m| m.aliases.iter().map(move |a| (a.as_str(), m.id.as_str())))
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }
}
