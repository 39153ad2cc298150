//! Error types for workflow execution

use thiserror::Error;

pub type Result<T> = std::result::Result<T, WorkflowError>;

#[derive(Debug, Error)]
pub enum WorkflowError {
    /// A task's agent failed after the retry policy gave up
    #[error("task '{task}' failed: {source}")]
    TaskFailed {
        task: String,
        #[source]
        source: agent_core::Error,
    },

    /// Workflow was built without tasks
    #[error("workflow '{0}' has no tasks")]
    Empty(String),

    /// Two tasks share a name, so their outputs would collide
    #[error("workflow '{workflow}' has duplicate task '{task}'")]
    DuplicateTask { workflow: String, task: String },
}

impl WorkflowError {
    /// Name of the failing task, if any
    pub fn task(&self) -> Option<&str> {
        match self {
            Self::TaskFailed { task, .. } => Some(task),
            _ => None,
        }
    }
}
