//! Core abstractions shared by the analyst crates
//!
//! Defines the [`Agent`] trait every delegated worker implements, the
//! [`Context`] a workflow threads through its tasks, and the common error type.

pub mod agent;
pub mod context;
pub mod error;

pub use agent::Agent;
pub use context::{Context, FinishedTask};
pub use error::{Error, Result};
