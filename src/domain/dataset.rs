//! Reported figures for one company and one reporting period.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use chrono::NaiveDate;

/// Membership test over raw field keys. Planning only needs to know which
/// keys exist, not their values.
pub trait KeySet {
    fn contains_key(&self, key: &str) -> bool;
}

impl KeySet for HashSet<String> {
    fn contains_key(&self, key: &str) -> bool {
        self.contains(key)
    }
}

impl KeySet for BTreeSet<String> {
    fn contains_key(&self, key: &str) -> bool {
        self.contains(key)
    }
}

/// Raw field key (`is.NetRevenue`, `bs.TotalAssets`) to value. Immutable once
/// built; the interpreter only ever reads it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FinancialDataset {
    company: Option<String>,
    period_end: Option<NaiveDate>,
    values: BTreeMap<String, f64>,
}

impl FinancialDataset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_values<I, K>(values: I) -> Self
    where
        I: IntoIterator<Item = (K, f64)>,
        K: Into<String>,
    {
        Self {
            values: values.into_iter().map(|(k, v)| (k.into(), v)).collect(),
            ..Self::default()
        }
    }

    pub fn with_value(mut self, key: &str, value: f64) -> Self {
        self.values.insert(key.to_string(), value);
        self
    }

    pub fn with_company(mut self, company: &str) -> Self {
        self.company = Some(company.to_string());
        self
    }

    pub fn with_period_end(mut self, period_end: NaiveDate) -> Self {
        self.period_end = Some(period_end);
        self
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        self.values.get(key).copied()
    }

    pub fn company(&self) -> Option<&str> {
        self.company.as_deref()
    }

    pub fn period_end(&self) -> Option<NaiveDate> {
        self.period_end
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl KeySet for FinancialDataset {
    fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for FinancialDataset {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        Self::from_values(iter)
    }
}
