//! Error types for agent-core

use thiserror::Error;

/// Result type alias for agent-core
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for agent operations
#[derive(Error, Debug)]
pub enum Error {
    /// Generic error message
    #[error("{0}")]
    Generic(String),

    /// Agent could not be built from its profile
    #[error("Agent initialization failed: {0}")]
    InitializationFailed(String),

    /// Agent processing failed
    #[error("Agent processing failed: {0}")]
    ProcessingFailed(String),

    /// Collaborator refused the request; retrying will not help
    #[error("Request rejected: {0}")]
    Rejected(String),

    /// Agent did not answer in time
    #[error("Agent '{agent}' timed out after {seconds}s")]
    Timeout { agent: String, seconds: u64 },
}

impl Error {
    /// Whether another attempt could succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::ProcessingFailed(_))
    }
}
