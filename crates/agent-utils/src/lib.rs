//! Shared utilities
//!
//! Logging setup and environment-variable configuration helpers used by the
//! analyst crates.

pub mod config;
pub mod logging;

pub use config::{ConfigError, EnvReader};
pub use logging::{LogFormat, init_tracing};
