//! Environment-based configuration helpers
//!
//! [`EnvReader`] wraps a variable lookup so configuration code can be driven
//! by the real process environment or, in tests, by a plain map.

use std::collections::HashMap;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

/// Errors raised while reading configuration values
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("required environment variable {0} is not set")]
    Missing(String),

    #[error("environment variable {var}={value:?} is invalid: {reason}")]
    Invalid {
        var: String,
        value: String,
        reason: String,
    },
}

type Lookup = Box<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Source of configuration variables
pub struct EnvReader {
    lookup: Lookup,
}

impl EnvReader {
    /// Read from the process environment after loading `.env`, if present
    pub fn from_env() -> Self {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = %path.display(), "Loaded .env file");
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read through an arbitrary lookup function
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String> + Send + Sync + 'static) -> Self {
        Self {
            lookup: Box::new(lookup),
        }
    }

    /// Read from a fixed set of pairs
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let map: HashMap<String, String> = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self::from_lookup(move |key| map.get(key).cloned())
    }

    /// Value of `key`, treating blank values as unset
    pub fn get(&self, key: &str) -> Option<String> {
        (self.lookup)(key).filter(|v| !v.trim().is_empty())
    }

    pub fn require(&self, key: &str) -> Result<String, ConfigError> {
        self.get(key)
            .ok_or_else(|| ConfigError::Missing(key.to_string()))
    }

    /// Parse `key` when set
    pub fn parse<T>(&self, key: &str) -> Result<Option<T>, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.get(key)
            .map(|value| {
                value.trim().parse::<T>().map_err(|e| ConfigError::Invalid {
                    var: key.to_string(),
                    value: value.clone(),
                    reason: e.to_string(),
                })
            })
            .transpose()
    }

    pub fn path(&self, key: &str) -> Option<PathBuf> {
        self.get(key).map(PathBuf::from)
    }
}

impl std::fmt::Debug for EnvReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvReader").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_counts_as_missing() {
        let env = EnvReader::from_pairs([("OPENAI_API_KEY", "  "), ("BRAVE_API_KEY", "b")]);
        assert_eq!(env.get("OPENAI_API_KEY"), None);
        assert_eq!(
            env.require("OPENAI_API_KEY"),
            Err(ConfigError::Missing("OPENAI_API_KEY".to_string()))
        );
        assert_eq!(env.require("BRAVE_API_KEY").unwrap(), "b");
    }

    #[test]
    fn test_parse() {
        let env = EnvReader::from_pairs([("SEARCH_RESULTS", "5"), ("TIMEOUT", "soon")]);
        assert_eq!(env.parse::<usize>("SEARCH_RESULTS").unwrap(), Some(5));
        assert_eq!(env.parse::<usize>("UNSET").unwrap(), None);
        assert!(matches!(
            env.parse::<u64>("TIMEOUT"),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn test_path() {
        let env = EnvReader::from_pairs([("OUT", "./reports")]);
        assert_eq!(env.path("OUT"), Some(PathBuf::from("./reports")));
    }
}
