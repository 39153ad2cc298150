//! Core Agent trait definition

use crate::{Context, Result};
use async_trait::async_trait;

/// A worker that turns a task description into generated text.
///
/// Input and output are plain strings; the agent may read run metadata and
/// the outputs of earlier tasks from the [`Context`].
#[async_trait]
pub trait Agent: Send + Sync {
    /// Process a task description and return the generated text
    async fn process(&self, input: String, context: &mut Context) -> Result<String>;

    /// Get the agent's name
    fn name(&self) -> &str;
}
