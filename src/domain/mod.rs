//! Core domain types and logic.

pub mod error;
pub mod formula;
pub mod formula_parser;
pub mod metric;
pub mod alias;
pub mod dataset;
pub mod catalog;
pub mod registry;
pub mod planner;
pub mod validator;
pub mod evaluator;
pub mod interpreter;
pub mod query;
pub mod config_validation;
