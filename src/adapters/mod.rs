//! Concrete adapter implementations for ports.

pub mod dataset_file_adapter;
pub mod definitions_file_adapter;
pub mod export;
pub mod file_config_adapter;
