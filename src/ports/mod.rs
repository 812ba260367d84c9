//! Port traits: the seams between the domain and the outside world.

pub mod config_port;
pub mod dataset_port;
pub mod export_port;
