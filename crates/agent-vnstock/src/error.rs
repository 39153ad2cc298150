//! Error types for the analyst pipeline

use crate::statement::ColumnLabel;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while fetching, normalizing, delegating or writing reports
#[derive(Debug, Error)]
pub enum AnalystError {
    /// Vendor label pair with no entry in the label table
    #[error("No canonical mapping for label {label}")]
    UnmappedLabel { label: ColumnLabel },

    /// Two distinct source columns flatten to the same key
    #[error("Columns {first} and {second} both normalize to '{key}'")]
    NormalizationCollision {
        key: String,
        first: ColumnLabel,
        second: ColumnLabel,
    },

    /// The data source could not provide a statement
    #[error("{kind} data unavailable for {symbol}: {reason}")]
    DataUnavailable {
        symbol: String,
        kind: String,
        reason: String,
    },

    /// An agent task failed after the workflow's retry policy gave up
    #[error("Task '{task}' failed: {reason}")]
    DelegationFailed { task: String, reason: String },

    /// An artifact could not be written
    #[error("Failed to write {}: {source}", path.display())]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Missing credential or invalid setting
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Label table or crew file rejected at load time
    #[error("Invalid {what}: {reason}")]
    InvalidDefinition { what: String, reason: String },

    /// Statement whose columns and periods disagree
    #[error("Malformed statement: {0}")]
    MalformedStatement(String),

    /// Template registration or rendering failed
    #[error("Template error: {0}")]
    Template(#[from] agent_prompt::PromptError),

    /// Network or HTTP error
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl AnalystError {
    pub fn unavailable(
        symbol: impl Into<String>,
        kind: impl ToString,
        reason: impl Into<String>,
    ) -> Self {
        Self::DataUnavailable {
            symbol: symbol.into(),
            kind: kind.to_string(),
            reason: reason.into(),
        }
    }

    pub fn invalid(what: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidDefinition {
            what: what.into(),
            reason: reason.into(),
        }
    }
}

/// Result type alias for analyst operations
pub type Result<T> = std::result::Result<T, AnalystError>;

impl From<agent_utils::ConfigError> for AnalystError {
    fn from(err: agent_utils::ConfigError) -> Self {
        AnalystError::Configuration(err.to_string())
    }
}

impl From<agent_workflow::WorkflowError> for AnalystError {
    fn from(err: agent_workflow::WorkflowError) -> Self {
        match err {
            agent_workflow::WorkflowError::TaskFailed { task, source } => {
                AnalystError::DelegationFailed {
                    task,
                    reason: source.to_string(),
                }
            }
            other => AnalystError::Configuration(other.to_string()),
        }
    }
}

/// Convert AnalystError to agent_core::Error
impl From<AnalystError> for agent_core::Error {
    fn from(err: AnalystError) -> Self {
        match err {
            AnalystError::Network(_) | AnalystError::DataUnavailable { .. } => {
                agent_core::Error::ProcessingFailed(err.to_string())
            }
            other => agent_core::Error::Rejected(other.to_string()),
        }
    }
}

/// Convert agent_core::Error to AnalystError
impl From<agent_core::Error> for AnalystError {
    fn from(err: agent_core::Error) -> Self {
        AnalystError::DelegationFailed {
            task: "agent".to_string(),
            reason: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AnalystError::unavailable("XYZ", "ratios", "empty response");
        assert_eq!(err.to_string(), "ratios data unavailable for XYZ: empty response");

        let err = AnalystError::NormalizationCollision {
            key: "Liquidity_Current_Ratio".into(),
            first: ColumnLabel::new("Thanh khoản", "Current Ratio"),
            second: ColumnLabel::new("Liquidity", "Current Ratio"),
        };
        assert_eq!(
            err.to_string(),
            "Columns (Thanh khoản, Current Ratio) and (Liquidity, Current Ratio) both normalize to 'Liquidity_Current_Ratio'"
        );
    }

    #[test]
    fn test_workflow_failure_becomes_delegation_failure() {
        let err: AnalystError = agent_workflow::WorkflowError::TaskFailed {
            task: "news_research".into(),
            source: agent_core::Error::Rejected("401".into()),
        }
        .into();

        match err {
            AnalystError::DelegationFailed { task, reason } => {
                assert_eq!(task, "news_research");
                assert!(reason.contains("401"));
            }
            other => panic!("Expected DelegationFailed, got {other:?}"),
        }
    }

    #[test]
    fn test_error_conversion() {
        let agent_err: agent_core::Error =
            AnalystError::unavailable("REE", "ratios", "HTTP 503").into();
        assert!(agent_err.is_transient());

        let agent_err: agent_core::Error = AnalystError::Configuration("no key".into()).into();
        assert!(!agent_err.is_transient());
    }
}
