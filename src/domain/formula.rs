//! Formula AST and evaluation.
//!
//! A formula is a small arithmetic expression over references:
//! - `Expr`: the expression tree
//! - `Formula`: a compiled expression plus its statically derived requirements
//!
//! A reference containing a `.` is a raw dataset field (`is.NetRevenue`);
//! every other reference names a metric.

use std::fmt;

use crate::domain::error::ParseError;
use crate::domain::formula_parser;

/// Returns true when `reference` names a raw dataset field rather than a metric.
pub fn is_raw_key(reference: &str) -> bool {
    reference.contains('.')
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl BinaryOp {
    fn symbol(self) -> char {
        match self {
            BinaryOp::Add => '+',
            BinaryOp::Subtract => '-',
            BinaryOp::Multiply => '*',
            BinaryOp::Divide => '/',
        }
    }

    fn precedence(self) -> u8 {
        match self {
            BinaryOp::Add | BinaryOp::Subtract => 1,
            BinaryOp::Multiply | BinaryOp::Divide => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    Abs,
    Min,
    Max,
}

impl Function {
    pub fn name(self) -> &'static str {
        match self {
            Function::Abs => "abs",
            Function::Min => "min",
            Function::Max => "max",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Ref(String),
    Neg(Box<Expr>),
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Call { func: Function, args: Vec<Expr> },
}

/// Arithmetic failure inside a formula.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FormulaError {
    #[error("division by zero: {numerator} / {denominator}")]
    DivisionByZero {
        numerator: String,
        denominator: String,
    },

    #[error("non-finite result from {expression}")]
    NonFinite { expression: String },

    #[error("no value for '{0}'")]
    Unresolved(String),
}

impl Expr {
    /// Evaluate against a lookup for references. The lookup is consulted once
    /// per reference occurrence; it must not have side effects.
    pub fn eval<F>(&self, lookup: &F) -> Result<f64, FormulaError>
    where
        F: Fn(&str) -> Option<f64>,
    {
        let value = match self {
            Expr::Number(n) => *n,
            Expr::Ref(name) => {
                lookup(name).ok_or_else(|| FormulaError::Unresolved(name.clone()))?
            }
            Expr::Neg(inner) => -inner.eval(lookup)?,
            Expr::Binary { op, left, right } => {
                let l = left.eval(lookup)?;
                let r = right.eval(lookup)?;
                match op {
                    BinaryOp::Add => l + r,
                    BinaryOp::Subtract => l - r,
                    BinaryOp::Multiply => l * r,
                    BinaryOp::Divide => {
                        if r == 0.0 {
                            return Err(FormulaError::DivisionByZero {
                                numerator: left.to_string(),
                                denominator: right.to_string(),
                            });
                        }
                        l / r
                    }
                }
            }
            Expr::Call { func, args } => {
                let values = args
                    .iter()
                    .map(|a| a.eval(lookup))
                    .collect::<Result<Vec<f64>, _>>()?;
                match func {
                    Function::Abs => values.first().copied().unwrap_or(f64::NAN).abs(),
                    Function::Min => values.iter().copied().fold(f64::INFINITY, f64::min),
                    Function::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
                }
            }
        };

        if !value.is_finite() {
            return Err(FormulaError::NonFinite {
                expression: self.to_string(),
            });
        }
        Ok(value)
    }

    /// References in order of first appearance, without duplicates.
    pub fn references(&self) -> Vec<String> {
        let mut refs = Vec::new();
        self.collect_references(&mut refs);
        refs
    }

    fn collect_references(&self, refs: &mut Vec<String>) {
        match self {
            Expr::Number(_) => {}
            Expr::Ref(name) => {
                if !refs.iter().any(|r| r == name) {
                    refs.push(name.clone());
                }
            }
            Expr::Neg(inner) => inner.collect_references(refs),
            Expr::Binary { left, right, .. } => {
                left.collect_references(refs);
                right.collect_references(refs);
            }
            Expr::Call { args, .. } => {
                for arg in args {
                    arg.collect_references(refs);
                }
            }
        }
    }

    fn fmt_with_parent(&self, f: &mut fmt::Formatter<'_>, parent: u8, right_side: bool) -> fmt::Result {
        match self {
            Expr::Binary { op, left, right } => {
                let prec = op.precedence();
                // Left-associative: a right operand at equal precedence needs parens.
                let needs_parens = prec < parent || (right_side && prec == parent);
                if needs_parens {
                    write!(f, "(")?;
                }
                left.fmt_with_parent(f, prec, false)?;
                write!(f, " {} ", op.symbol())?;
                right.fmt_with_parent(f, prec, true)?;
                if needs_parens {
                    write!(f, ")")?;
                }
                Ok(())
            }
            Expr::Neg(inner) => {
                write!(f, "-")?;
                inner.fmt_with_parent(f, 3, false)
            }
            Expr::Number(n) => write!(f, "{n}"),
            Expr::Ref(name) => write!(f, "{name}"),
            Expr::Call { func, args } => {
                write!(f, "{}(", func.name())?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    arg.fmt_with_parent(f, 0, false)?;
                }
                write!(f, ")")
            }
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_with_parent(f, 0, false)
    }
}

/// A compiled formula. `requires` is derived from the tree at compile time.
#[derive(Debug, Clone, PartialEq)]
pub struct Formula {
    expr: Expr,
    requires: Vec<String>,
}

impl Formula {
    pub fn parse(source: &str) -> Result<Self, ParseError> {
        let expr = formula_parser::parse(source)?;
        Ok(Self::from_expr(expr))
    }

    pub fn from_expr(expr: Expr) -> Self {
        let requires = expr.references();
        Self { expr, requires }
    }

    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    pub fn requires(&self) -> &[String] {
        &self.requires
    }

    pub fn metric_refs(&self) -> impl Iterator<Item = &str> {
        self.requires
            .iter()
            .map(String::as_str)
            .filter(|r| !is_raw_key(r))
    }

    pub fn raw_refs(&self) -> impl Iterator<Item = &str> {
        self.requires.iter().map(String::as_str).filter(|r| is_raw_key(r))
    }

    pub fn eval<F>(&self, lookup: &F) -> Result<f64, FormulaError>
    where
        F: Fn(&str) -> Option<f64>,
    {
        self.expr.eval(lookup)
    }
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.expr.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn values(pairs: &[(&str, f64)]) -> HashMap<String, f64> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    fn eval(source: &str, pairs: &[(&str, f64)]) -> Result<f64, FormulaError> {
        let vals = values(pairs);
        Formula::parse(source).unwrap().eval(&|k: &str| vals.get(k).copied())
    }

    #[test]
    fn raw_key_detection() {
        assert!(is_raw_key("is.NetRevenue"));
        assert!(is_raw_key("prior.is.NetRevenue"));
        assert!(!is_raw_key("revenue"));
        assert!(!is_raw_key("pp&e"));
    }

    #[test]
    fn requires_in_first_appearance_order() {
        let f = Formula::parse("(cash + short_term_investments + cash) / current_liabilities").unwrap();
        assert_eq!(
            f.requires(),
            &["cash", "short_term_investments", "current_liabilities"]
        );
    }

    #[test]
    fn splits_metric_and_raw_refs() {
        let f = Formula::parse("operating_income + is.D&A").unwrap();
        assert_eq!(f.metric_refs().collect::<Vec<_>>(), vec!["operating_income"]);
        assert_eq!(f.raw_refs().collect::<Vec<_>>(), vec!["is.D&A"]);
    }

    #[test]
    fn evaluates_arithmetic() {
        assert_eq!(eval("revenue - cogs", &[("revenue", 100.0), ("cogs", 60.0)]), Ok(40.0));
        assert_eq!(eval("a * 365 / b", &[("a", 10.0), ("b", 100.0)]), Ok(36.5));
        assert_eq!(eval("-a + 1", &[("a", 3.0)]), Ok(-2.0));
    }

    #[test]
    fn evaluates_functions() {
        assert_eq!(eval("abs(capex)", &[("capex", -11.75)]), Ok(11.75));
        assert_eq!(eval("min(a, b, 3)", &[("a", 5.0), ("b", 4.0)]), Ok(3.0));
        assert_eq!(eval("max(a, b)", &[("a", 5.0), ("b", 4.0)]), Ok(5.0));
    }

    #[test]
    fn division_by_zero_names_operands() {
        let err = eval("net_income / revenue", &[("net_income", 1.0), ("revenue", 0.0)]).unwrap_err();
        assert_eq!(
            err,
            FormulaError::DivisionByZero {
                numerator: "net_income".into(),
                denominator: "revenue".into(),
            }
        );
        assert_eq!(err.to_string(), "division by zero: net_income / revenue");
    }

    #[test]
    fn only_exact_zero_denominators_fail() {
        let small = eval("a / b", &[("a", 1.0), ("b", 1e-13)]).unwrap();
        assert!((small - 1e13).abs() < 1.0, "{small}");
        assert!(eval("a / b", &[("a", 1.0), ("b", -0.0)]).is_err());
    }

    #[test]
    fn unresolved_reference_is_reported() {
        let err = eval("a + b", &[("a", 1.0)]).unwrap_err();
        assert_eq!(err, FormulaError::Unresolved("b".into()));
    }

    #[test]
    fn non_finite_values_are_rejected() {
        let err = eval("a * 2", &[("a", f64::INFINITY)]).unwrap_err();
        assert!(matches!(err, FormulaError::NonFinite { .. }));
    }

    #[test]
    fn display_keeps_needed_parentheses_only() {
        let f = Formula::parse("(cash + ar) / (cl)").unwrap();
        assert_eq!(f.to_string(), "(cash + ar) / cl");
        let f = Formula::parse("a - (b - c)").unwrap();
        assert_eq!(f.to_string(), "a - (b - c)");
        let f = Formula::parse("a / b - 1").unwrap();
        assert_eq!(f.to_string(), "a / b - 1");
        let f = Formula::parse("abs(capex) / revenue").unwrap();
        assert_eq!(f.to_string(), "abs(capex) / revenue");
    }

    #[test]
    fn display_reparses_to_same_tree() {
        for source in [
            "days_inventory + days_sales_outstanding - days_payables",
            "operating_income * (1 - effective_tax_rate_pct)",
            "-(a - b) * c",
            "a / (b * c)",
        ] {
            let f = Formula::parse(source).unwrap();
            let again = Formula::parse(&f.to_string()).unwrap();
            assert_eq!(f, again, "{source}");
        }
    }
}
