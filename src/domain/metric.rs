//! Metric definition data structures.
//!
//! - `Category`: which statement or analysis family a metric belongs to
//! - `Unit`: how a value is displayed (values are always stored unscaled)
//! - `MetricSpec`: an uncompiled definition, as written in the catalogue or a file
//! - `MetricDefinition`: a compiled definition held by the registry

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::domain::formula::{is_raw_key, Formula};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    IncomeStatement,
    BalanceSheet,
    CashFlow,
    RatioMargin,
    Growth,
    PerShare,
    Return,
    Liquidity,
    Valuation,
}

impl Category {
    pub const ALL: [Category; 9] = [
        Category::IncomeStatement,
        Category::BalanceSheet,
        Category::CashFlow,
        Category::RatioMargin,
        Category::Growth,
        Category::PerShare,
        Category::Return,
        Category::Liquidity,
        Category::Valuation,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::IncomeStatement => "income_statement",
            Category::BalanceSheet => "balance_sheet",
            Category::CashFlow => "cash_flow",
            Category::RatioMargin => "ratio_margin",
            Category::Growth => "growth",
            Category::PerShare => "per_share",
            Category::Return => "return",
            Category::Liquidity => "liquidity",
            Category::Valuation => "valuation",
        }
    }

    /// Heading used in human-facing listings.
    pub fn title(self) -> &'static str {
        match self {
            Category::IncomeStatement => "Income Statement",
            Category::BalanceSheet => "Balance Sheet",
            Category::CashFlow => "Cash Flow",
            Category::RatioMargin => "Ratios & Margins",
            Category::Growth => "Growth",
            Category::PerShare => "Per Share",
            Category::Return => "Returns",
            Category::Liquidity => "Leverage & Liquidity",
            Category::Valuation => "Valuation",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    /// Accepts `income_statement`, `IncomeStatement` and `income statement`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, '_' | ' ' | '-'))
            .collect::<String>()
            .to_lowercase();
        Category::ALL
            .into_iter()
            .find(|c| c.as_str().replace('_', "") == key)
            .ok_or_else(|| format!("unknown category '{}'", s.trim()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Unit {
    Currency,
    Ratio,
    /// Stored as a decimal fraction: 0.25 means 25%.
    Percent,
    Days,
    Count,
}

impl Unit {
    pub fn as_str(self) -> &'static str {
        match self {
            Unit::Currency => "currency",
            Unit::Ratio => "ratio",
            Unit::Percent => "percent",
            Unit::Days => "days",
            Unit::Count => "count",
        }
    }

    pub fn format_value(self, value: f64) -> String {
        match self {
            Unit::Currency => format!("{:.2}", value),
            Unit::Ratio => format!("{:.2}x", value),
            Unit::Percent => format!("{:.2}%", value * 100.0),
            Unit::Days => format!("{:.1} days", value),
            Unit::Count => format!("{:.0}", value),
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Unit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "currency" => Ok(Unit::Currency),
            "ratio" => Ok(Unit::Ratio),
            "percent" | "pct" | "percent_as_decimal" => Ok(Unit::Percent),
            "days" => Ok(Unit::Days),
            "count" => Ok(Unit::Count),
            other => Err(format!("unknown unit '{}'", other)),
        }
    }
}

/// How a metric obtains its value.
#[derive(Debug, Clone, PartialEq)]
pub enum MetricKind {
    /// Read straight from a raw dataset field. When the field is absent and a
    /// fallback exists, the fallback formula computes the value instead.
    Direct {
        field: String,
        fallback: Option<Formula>,
    },
    Derived { formula: Formula },
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetricDefinition {
    pub id: String,
    pub category: Category,
    pub unit: Unit,
    pub description: String,
    pub kind: MetricKind,
    pub aliases: Vec<String>,
}

impl MetricDefinition {
    /// Every dependency the metric may need: raw keys and metric ids.
    pub fn requires(&self) -> Vec<&str> {
        match &self.kind {
            MetricKind::Direct { field, fallback } => {
                let mut requires = vec![field.as_str()];
                if let Some(formula) = fallback {
                    requires.extend(formula.requires().iter().map(String::as_str));
                }
                requires
            }
            MetricKind::Derived { formula } => formula.requires().iter().map(String::as_str).collect(),
        }
    }

    /// Metric ids this definition depends on, across direct fallbacks too.
    pub fn metric_dependencies(&self) -> Vec<&str> {
        self.requires().into_iter().filter(|r| !is_raw_key(r)).collect()
    }

    /// The formula text as exported: the raw field for plain direct metrics.
    pub fn formula_text(&self) -> String {
        match &self.kind {
            MetricKind::Direct {
                field,
                fallback: None,
            } => field.clone(),
            MetricKind::Direct {
                field,
                fallback: Some(formula),
            } => format!("{} (else {})", field, formula),
            MetricKind::Derived { formula } => formula.to_string(),
        }
    }

    pub fn is_direct(&self) -> bool {
        matches!(self.kind, MetricKind::Direct { .. })
    }

    /// Case-insensitive substring match on id, aliases, description and requirements.
    pub fn matches_keyword(&self, keyword: &str) -> bool {
        let keyword = keyword.trim().to_lowercase();
        if keyword.is_empty() {
            return false;
        }
        self.id.to_lowercase().contains(&keyword)
            || self.description.to_lowercase().contains(&keyword)
            || self.aliases.iter().any(|a| a.to_lowercase().contains(&keyword))
            || self.requires().iter().any(|r| r.to_lowercase().contains(&keyword))
    }
}

/// Source text of a metric's value, before compilation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecSource {
    Direct {
        field: String,
        fallback: Option<String>,
    },
    Derived { formula: String },
}

/// An uncompiled metric definition. The registry builder compiles and
/// validates these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricSpec {
    pub id: String,
    pub category: Category,
    pub unit: Unit,
    pub description: String,
    pub source: SpecSource,
    pub aliases: Vec<String>,
}

impl MetricSpec {
    pub fn direct(id: &str, category: Category, unit: Unit, field: &str, description: &str) -> Self {
        Self {
            id: id.to_string(),
            category,
            unit,
            description: description.to_string(),
            source: SpecSource::Direct {
                field: field.to_string(),
                fallback: None,
            },
            aliases: Vec::new(),
        }
    }

    pub fn derived(id: &str, category: Category, unit: Unit, formula: &str, description: &str) -> Self {
        Self {
            id: id.to_string(),
            category,
            unit,
            description: description.to_string(),
            source: SpecSource::Derived {
                formula: formula.to_string(),
            },
            aliases: Vec::new(),
        }
    }

    /// Attach a fallback formula to a direct metric. No effect on derived metrics.
    pub fn fallback(mut self, formula: &str) -> Self {
        if let SpecSource::Direct { fallback, .. } = &mut self.source {
            *fallback = Some(formula.to_string());
        }
        self
    }

    pub fn aliases(mut self, aliases: &[&str]) -> Self {
        self.aliases.extend(aliases.iter().map(|a| a.to_string()));
        self
    }
}
