//! Task orchestration for delegated agents
//!
//! A [`Workflow`] binds named tasks to agents and runs them either one after
//! another (each task seeing earlier outputs in its [`agent_core::Context`])
//! or concurrently. Every agent call goes through the workflow's
//! [`RetryPolicy`], so retry and timeout decisions stay with the caller.

pub mod error;
pub mod retry;
pub mod workflow;

pub use error::{Result, WorkflowError};
pub use retry::RetryPolicy;
pub use workflow::{ExecutionMode, Task, TaskOutput, Workflow, WorkflowBuilder, WorkflowOutput};
