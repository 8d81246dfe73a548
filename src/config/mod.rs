//! Configuration module for batchproxy
//!
//! CLI arguments and the run configuration resolved from them.

mod settings;

pub use settings::*;
