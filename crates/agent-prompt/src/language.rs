//! Languages templates and vendor labels come in

use crate::PromptError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// English or Vietnamese
///
/// Parses from an ISO 639-1 code or the language name, and serializes as the
/// code.
///
/// ```
/// use agent_prompt::Language;
///
/// assert_eq!("vi-VN".parse::<Language>().unwrap(), Language::Vietnamese);
/// assert_eq!(Language::Vietnamese.code(), "vi");
/// assert!("ja".parse::<Language>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Language {
    #[default]
    English,
    Vietnamese,
}

impl Language {
    pub const ALL: [Self; 2] = [Self::English, Self::Vietnamese];

    pub fn code(self) -> &'static str {
        match self {
            Self::English => "en",
            Self::Vietnamese => "vi",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::English => "English",
            Self::Vietnamese => "Vietnamese",
        }
    }
}

impl FromStr for Language {
    type Err = PromptError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "en" | "en-us" | "english" => Ok(Self::English),
            "vi" | "vi-vn" | "vietnamese" | "tiếng việt" => Ok(Self::Vietnamese),
            _ => Err(PromptError::UnsupportedLanguage(s.trim().to_string())),
        }
    }
}

impl TryFrom<String> for Language {
    type Error = PromptError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Language> for String {
    fn from(lang: Language) -> Self {
        lang.code().to_string()
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        assert_eq!("EN".parse::<Language>().unwrap(), Language::English);
        assert_eq!(" vi ".parse::<Language>().unwrap(), Language::Vietnamese);
        assert_eq!("Tiếng Việt".parse::<Language>().unwrap(), Language::Vietnamese);

        let err = "fr".parse::<Language>().unwrap_err();
        assert!(err.to_string().contains("'fr'"));
    }

    #[test]
    fn test_serde_uses_code() {
        let json = serde_json::to_string(&Language::Vietnamese).unwrap();
        assert_eq!(json, "\"vi\"");
        let parsed: Language = serde_json::from_str("\"english\"").unwrap();
        assert_eq!(parsed, Language::English);
        assert!(serde_json::from_str::<Language>("\"de\"").is_err());
    }
}
