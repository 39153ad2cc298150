//! Configuration for analyst runs
//!
//! [`AnalystConfig`] is built once (from the environment, a builder, or
//! both), validated by the pipeline constructor and then passed around by
//! reference. Nothing reads the environment after that.
//!
//! | Variable | Field |
//! |---|---|
//! | `OPENAI_API_KEY` | `openai_api_key` (required) |
//! | `BRAVE_API_KEY` | `brave_api_key` (required) |
//! | `VNSTOCK_API_KEY` | `vnstock_api_key` |
//! | `OPENAI_API_BASE` | `llm_api_base` |
//! | `ANALYST_MODEL` | `model` |
//! | `ANALYST_MAX_TOKENS` | `max_tokens` |
//! | `ANALYST_TEMPERATURE` | `temperature` |
//! | `ANALYST_ANALYSIS_TYPE` | `analysis_type` |
//! | `ANALYST_EXECUTION_MODE` | `execution_mode` |
//! | `ANALYST_PERIOD` | `period` |
//! | `ANALYST_LANGUAGE` | `language` |
//! | `ANALYST_SEARCH_RESULTS` | `search_results` |
//! | `ANALYST_OUTPUT_DIR` | `output_dir` |
//! | `ANALYST_LABELS` | `labels_path` |
//! | `ANALYST_CREW` | `crew_path` |
//! | `ANALYST_TEMPLATES` | `templates_dir` |
//! | `ANALYST_REQUEST_TIMEOUT_SECS` | `request_timeout` |
//! | `ANALYST_LLM_TIMEOUT_SECS` | `llm_timeout` |
//! | `ANALYST_MAX_ATTEMPTS` | `max_attempts` |

use crate::error::{AnalystError, Result};
use agent_llm::providers::DEFAULT_OPENAI_API_BASE;
use agent_prompt::Language;
use agent_utils::EnvReader;
use agent_workflow::{ExecutionMode, RetryPolicy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_MODEL: &str = "gpt-4.1-mini";

/// Flavour of the financial analysis task
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisType {
    #[default]
    Comprehensive,
    Profitability,
    Liquidity,
}

impl AnalysisType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Comprehensive => "comprehensive",
            Self::Profitability => "profitability",
            Self::Liquidity => "liquidity",
        }
    }

    /// Name of the crew task that performs this analysis
    pub fn task_name(&self) -> &'static str {
        match self {
            Self::Comprehensive => "financial_analysis",
            Self::Profitability => "profitability_analysis",
            Self::Liquidity => "liquidity_analysis",
        }
    }

    /// Title-cased label for report headers
    pub fn title(&self) -> &'static str {
        match self {
            Self::Comprehensive => "Comprehensive",
            Self::Profitability => "Profitability",
            Self::Liquidity => "Liquidity",
        }
    }
}

impl fmt::Display for AnalysisType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnalysisType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "comprehensive" => Ok(Self::Comprehensive),
            "profitability" => Ok(Self::Profitability),
            "liquidity" => Ok(Self::Liquidity),
            other => Err(format!("Unknown analysis type: {other}")),
        }
    }
}

/// Reporting period of fetched statements
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportPeriod {
    #[default]
    Year,
    Quarter,
}

impl fmt::Display for ReportPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Year => "year",
            Self::Quarter => "quarter",
        })
    }
}

impl FromStr for ReportPeriod {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "year" | "yearly" | "y" => Ok(Self::Year),
            "quarter" | "quarterly" | "q" => Ok(Self::Quarter),
            other => Err(format!("unknown period '{other}' (expected year or quarter)")),
        }
    }
}

/// Settings for one analyst run
#[derive(Clone, Serialize, Deserialize)]
pub struct AnalystConfig {
    #[serde(default, skip_serializing)]
    pub openai_api_key: Option<String>,

    #[serde(default, skip_serializing)]
    pub brave_api_key: Option<String>,

    /// Sent to the market-data gateway when set
    #[serde(default, skip_serializing)]
    pub vnstock_api_key: Option<String>,

    /// OpenAI-compatible chat-completions base URL
    pub llm_api_base: String,

    pub model: String,

    pub max_tokens: usize,

    pub temperature: f32,

    pub analysis_type: AnalysisType,

    /// How the analysis and news tasks are scheduled
    pub execution_mode: ExecutionMode,

    pub period: ReportPeriod,

    /// Language of vendor labels requested from the data source
    pub language: Language,

    /// Search results requested per query
    pub search_results: usize,

    /// Where the three artifacts are written
    pub output_dir: PathBuf,

    /// Label table replacing the embedded one
    pub labels_path: Option<PathBuf>,

    /// Crew file replacing the embedded one
    pub crew_path: Option<PathBuf>,

    /// Directory of `<name>.md.j2` report template overrides
    pub templates_dir: Option<PathBuf>,

    /// Timeout for data and search requests
    pub request_timeout: Duration,

    /// Timeout for one LLM attempt
    pub llm_timeout: Duration,

    /// Attempts per delegated task, including the first
    pub max_attempts: u32,
}

impl Default for AnalystConfig {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            brave_api_key: None,
            vnstock_api_key: None,
            llm_api_base: DEFAULT_OPENAI_API_BASE.to_string(),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: 4000,
            temperature: 0.2,
            analysis_type: AnalysisType::default(),
            execution_mode: ExecutionMode::Sequential,
            period: ReportPeriod::default(),
            language: Language::English,
            search_results: 3,
            output_dir: PathBuf::from("."),
            labels_path: None,
            crew_path: None,
            templates_dir: None,
            request_timeout: Duration::from_secs(30),
            llm_timeout: Duration::from_secs(180),
            max_attempts: 3,
        }
    }
}

impl fmt::Debug for AnalystConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalystConfig")
            .field("openai_api_key", &self.openai_api_key.as_ref().map(|_| "<set>"))
            .field("brave_api_key", &self.brave_api_key.as_ref().map(|_| "<set>"))
            .field("vnstock_api_key", &self.vnstock_api_key.as_ref().map(|_| "<set>"))
            .field("llm_api_base", &self.llm_api_base)
            .field("model", &self.model)
            .field("analysis_type", &self.analysis_type)
            .field("execution_mode", &self.execution_mode)
            .field("period", &self.period)
            .field("language", &self.language)
            .field("output_dir", &self.output_dir)
            .finish_non_exhaustive()
    }
}

impl AnalystConfig {
    pub fn builder() -> AnalystConfigBuilder {
        AnalystConfigBuilder::default()
    }

    /// Read the process environment, loading `.env` first when present
    pub fn from_env() -> Result<Self> {
        Self::from_reader(&EnvReader::from_env())
    }

    /// Read through an arbitrary variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String> + Send + Sync + 'static) -> Result<Self> {
        Self::from_reader(&EnvReader::from_lookup(lookup))
    }

    /// Defaults overridden by whatever `env` provides; not validated
    pub fn from_reader(env: &EnvReader) -> Result<Self> {
        let defaults = Self::default();
        let secs = |key: &str, fallback: Duration| -> Result<Duration> {
            Ok(env.parse::<u64>(key)?.map_or(fallback, Duration::from_secs))
        };

        Ok(Self {
            openai_api_key: env.get("OPENAI_API_KEY"),
            brave_api_key: env.get("BRAVE_API_KEY"),
            vnstock_api_key: env.get("VNSTOCK_API_KEY"),
            llm_api_base: env
                .get("OPENAI_API_BASE")
                .map_or(defaults.llm_api_base, |b| b.trim_end_matches('/').to_string()),
            model: env.get("ANALYST_MODEL").unwrap_or(defaults.model),
            max_tokens: env.parse("ANALYST_MAX_TOKENS")?.unwrap_or(defaults.max_tokens),
            temperature: env.parse("ANALYST_TEMPERATURE")?.unwrap_or(defaults.temperature),
            analysis_type: env
                .parse("ANALYST_ANALYSIS_TYPE")?
                .unwrap_or(defaults.analysis_type),
            execution_mode: env
                .parse("ANALYST_EXECUTION_MODE")?
                .unwrap_or(defaults.execution_mode),
            period: env.parse("ANALYST_PERIOD")?.unwrap_or(defaults.period),
            language: env.parse("ANALYST_LANGUAGE")?.unwrap_or(defaults.language),
            search_results: env
                .parse("ANALYST_SEARCH_RESULTS")?
                .unwrap_or(defaults.search_results),
            output_dir: env.path("ANALYST_OUTPUT_DIR").unwrap_or(defaults.output_dir),
            labels_path: env.path("ANALYST_LABELS"),
            crew_path: env.path("ANALYST_CREW"),
            templates_dir: env.path("ANALYST_TEMPLATES"),
            request_timeout: secs("ANALYST_REQUEST_TIMEOUT_SECS", defaults.request_timeout)?,
            llm_timeout: secs("ANALYST_LLM_TIMEOUT_SECS", defaults.llm_timeout)?,
            max_attempts: env.parse("ANALYST_MAX_ATTEMPTS")?.unwrap_or(defaults.max_attempts),
        })
    }

    /// Check credentials and ranges; called once before a run starts
    pub fn validate(&self) -> Result<()> {
        for (var, value) in [
            ("OPENAI_API_KEY", &self.openai_api_key),
            ("BRAVE_API_KEY", &self.brave_api_key),
        ] {
            if value.as_deref().is_none_or(|v| v.trim().is_empty()) {
                return Err(AnalystError::Configuration(format!(
                    "required credential {var} is not set"
                )));
            }
        }

        if self.model.trim().is_empty() {
            return Err(AnalystError::Configuration("model must not be empty".to_string()));
        }

        if self.max_tokens == 0 {
            return Err(AnalystError::Configuration(
                "max_tokens must be greater than 0".to_string(),
            ));
        }

        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(AnalystError::Configuration(format!(
                "temperature {} is outside 0.0..=2.0",
                self.temperature
            )));
        }

        if !(1..=20).contains(&self.search_results) {
            return Err(AnalystError::Configuration(format!(
                "search_results {} is outside 1..=20",
                self.search_results
            )));
        }

        if self.max_attempts == 0 {
            return Err(AnalystError::Configuration(
                "max_attempts must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Retry policy applied around every delegated task
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::default()
            .with_max_attempts(self.max_attempts)
            .with_attempt_timeout(Some(self.llm_timeout))
    }
}

/// Builder for AnalystConfig
#[derive(Debug, Default)]
pub struct AnalystConfigBuilder {
    config: AnalystConfig,
}

impl AnalystConfigBuilder {
    /// Start from an existing configuration, e.g. one read from the environment
    pub fn from_config(config: AnalystConfig) -> Self {
        Self { config }
    }

    pub fn openai_api_key(mut self, key: impl Into<String>) -> Self {
        self.config.openai_api_key = Some(key.into());
        self
    }

    pub fn brave_api_key(mut self, key: impl Into<String>) -> Self {
        self.config.brave_api_key = Some(key.into());
        self
    }

    pub fn vnstock_api_key(mut self, key: impl Into<String>) -> Self {
        self.config.vnstock_api_key = Some(key.into());
        self
    }

    pub fn llm_api_base(mut self, base: impl Into<String>) -> Self {
        self.config.llm_api_base = base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn max_tokens(mut self, max_tokens: usize) -> Self {
        self.config.max_tokens = max_tokens;
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.config.temperature = temperature;
        self
    }

    pub fn analysis_type(mut self, analysis_type: AnalysisType) -> Self {
        self.config.analysis_type = analysis_type;
        self
    }

    pub fn execution_mode(mut self, mode: ExecutionMode) -> Self {
        self.config.execution_mode = mode;
        self
    }

    pub fn period(mut self, period: ReportPeriod) -> Self {
        self.config.period = period;
        self
    }

    pub fn language(mut self, language: Language) -> Self {
        self.config.language = language;
        self
    }

    pub fn search_results(mut self, count: usize) -> Self {
        self.config.search_results = count;
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = dir.into();
        self
    }

    pub fn labels_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.labels_path = Some(path.into());
        self
    }

    pub fn crew_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.crew_path = Some(path.into());
        self
    }

    pub fn templates_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.templates_dir = Some(dir.into());
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    pub fn llm_timeout(mut self, timeout: Duration) -> Self {
        self.config.llm_timeout = timeout;
        self
    }

    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.config.max_attempts = attempts;
        self
    }

    /// Build and validate
    pub fn build(self) -> Result<AnalystConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys() -> AnalystConfigBuilder {
        AnalystConfig::builder()
            .openai_api_key("sk-test")
            .brave_api_key("brave-test")
    }

    #[test]
    fn test_default_config() {
        let config = AnalystConfig::default();
        assert_eq!(config.model, "gpt-4.1-mini");
        assert_eq!(config.analysis_type, AnalysisType::Comprehensive);
        assert_eq!(config.execution_mode, ExecutionMode::Sequential);
        assert_eq!(config.search_results, 3);
        assert_eq!(config.output_dir, PathBuf::from("."));
        assert_eq!(config.llm_api_base, "https://api.openai.com/v1");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_builder() {
        let config = keys()
            .analysis_type(AnalysisType::Liquidity)
            .execution_mode(ExecutionMode::Parallel)
            .llm_api_base("http://localhost:1234/v1/")
            .build()
            .unwrap();

        assert_eq!(config.analysis_type.task_name(), "liquidity_analysis");
        assert_eq!(config.execution_mode, ExecutionMode::Parallel);
        assert_eq!(config.llm_api_base, "http://localhost:1234/v1");
    }

    #[test]
    fn test_missing_credential_rejected() {
        let err = AnalystConfig::builder()
            .openai_api_key("sk-test")
            .build()
            .unwrap_err();
        assert!(matches!(err, AnalystError::Configuration(ref m) if m.contains("BRAVE_API_KEY")));
    }

    #[test]
    fn test_ranges_rejected() {
        assert!(keys().search_results(0).build().is_err());
        assert!(keys().temperature(3.5).build().is_err());
        assert!(keys().max_attempts(0).build().is_err());
    }

    #[test]
    fn test_from_lookup() {
        let config = AnalystConfig::from_lookup(|key| match key {
            "OPENAI_API_KEY" => Some("sk-env".into()),
            "BRAVE_API_KEY" => Some("brave-env".into()),
            "ANALYST_ANALYSIS_TYPE" => Some("Profitability".into()),
            "ANALYST_EXECUTION_MODE" => Some("parallel".into()),
            "ANALYST_PERIOD" => Some("quarter".into()),
            "ANALYST_LANGUAGE" => Some("vi".into()),
            "ANALYST_LLM_TIMEOUT_SECS" => Some("45".into()),
            _ => None,
        })
        .unwrap();

        config.validate().unwrap();
        assert_eq!(config.analysis_type, AnalysisType::Profitability);
        assert_eq!(config.execution_mode, ExecutionMode::Parallel);
        assert_eq!(config.period, ReportPeriod::Quarter);
        assert_eq!(config.language, Language::Vietnamese);
        assert_eq!(config.llm_timeout, Duration::from_secs(45));
        assert_eq!(config.retry_policy().attempt_timeout, Some(Duration::from_secs(45)));
    }

    #[test]
    fn test_invalid_variable_reported() {
        let err = AnalystConfig::from_lookup(|key| {
            (key == "ANALYST_ANALYSIS_TYPE").then(|| "valuation".to_string())
        })
        .unwrap_err();
        assert!(err.to_string().contains("Unknown analysis type: valuation"));

        let err = AnalystConfig::from_lookup(|key| {
            (key == "ANALYST_LANGUAGE").then(|| "fr".to_string())
        })
        .unwrap_err();
        assert!(err.to_string().contains("ANALYST_LANGUAGE"));
    }

    #[test]
    fn test_debug_hides_secrets() {
        let config = keys().build().unwrap();
        let printed = format!("{config:?}");
        assert!(!printed.contains("sk-test"));
        assert!(printed.contains("<set>"));

        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("sk-test"));
    }
}
