//! Error types for prompt and report templates

use crate::Language;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PromptError>;

#[derive(Error, Debug)]
pub enum PromptError {
    #[error("Template '{name}' has no {language} body")]
    MissingVariant { name: String, language: Language },

    #[error("Template '{name}' ({language}) does not parse: {source}")]
    Parse {
        name: String,
        language: Language,
        #[source]
        source: minijinja::Error,
    },

    #[error("Template '{name}' failed to render: {source}")]
    Render {
        name: String,
        #[source]
        source: minijinja::Error,
    },

    /// A template with no body in any language
    #[error("Template '{0}' has no bodies")]
    Empty(String),

    #[error("Template '{0}' is not registered")]
    NotRegistered(String),

    #[error("Cannot read templates from {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unsupported language '{0}' (expected en or vi)")]
    UnsupportedLanguage(String),
}

impl From<PromptError> for agent_core::Error {
    fn from(err: PromptError) -> Self {
        agent_core::Error::InitializationFailed(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_template() {
        let err = PromptError::MissingVariant {
            name: "report".into(),
            language: Language::Vietnamese,
        };
        assert_eq!(err.to_string(), "Template 'report' has no Vietnamese body");

        let core: agent_core::Error = PromptError::NotRegistered("news".into()).into();
        assert!(core.to_string().contains("'news' is not registered"));
    }
}
