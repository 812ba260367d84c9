//! finmetrics: financial metrics interpreter.
//!
//! Answers "what is metric M for this dataset?" for directly reported figures
//! and for metrics derived from them through formula chains.
//!
//! Hexagonal architecture: domain logic in [`domain`], port traits in [`ports`],
//! concrete implementations in [`adapters`], command line front end in [`cli`].

pub mod domain;
pub mod ports;
pub mod adapters;
pub mod cli;
