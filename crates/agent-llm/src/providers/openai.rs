//! OpenAI chat-completions provider
//!
//! Any OpenAI-compatible server works by pointing `api_base` at it.
//! See: https://platform.openai.com/docs/api-reference/chat
//!
//! ```no_run
//! use agent_llm::{CompletionRequest, LLMProvider};
//! use agent_llm::providers::{OpenAIConfig, OpenAIProvider};
//! use std::time::Duration;
//!
//! # async fn run() -> agent_llm::Result<()> {
//! let config = OpenAIConfig::new("sk-...").with_timeout(Duration::from_secs(60));
//! let provider = OpenAIProvider::with_config(config)?;
//!
//! let request = CompletionRequest::new("gpt-4.1-mini")
//!     .system("You are a financial analyst")
//!     .user("Summarise the liquidity of REE")
//!     .max_tokens(800);
//!
//! let response = provider.complete(request).await?;
//! println!("{}", response.message.content);
//! # Ok(())
//! # }
//! ```

use crate::{
    CompletionRequest, CompletionResponse, LLMError, LLMProvider, Message, Result, StopReason,
    TokenUsage,
};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument, warn};

pub const DEFAULT_OPENAI_API_BASE: &str = "https://api.openai.com/v1";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Clone)]
pub struct OpenAIConfig {
    pub api_key: String,
    /// Without trailing slash
    pub api_base: String,
    pub timeout: Duration,
}

impl OpenAIConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_base: DEFAULT_OPENAI_API_BASE.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_api_base(mut self, api_base: impl AsRef<str>) -> Self {
        self.api_base = api_base.as_ref().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.api_base)
    }
}

pub struct OpenAIProvider {
    client: Client,
    config: OpenAIConfig,
}

impl OpenAIProvider {
    pub fn with_config(config: OpenAIConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(LLMError::ConfigurationError("OpenAI API key is empty".to_string()));
        }

        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_config(OpenAIConfig::new(api_key))
    }

    pub fn config(&self) -> &OpenAIConfig {
        &self.config
    }
}

#[async_trait]
impl LLMProvider for OpenAIProvider {
    #[instrument(skip_all, fields(model = %request.model))]
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let model = request.model.clone();
        let body = ChatRequest::from(request);

        let response = self
            .client
            .post(self.config.completions_url())
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            warn!(%status, "Chat completion refused");
            return Err(error_for_status(status, text, model));
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| LLMError::UnexpectedResponse(format!("Failed to parse response: {e}")))?;
        chat.into_completion()
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}

/// Map a non-success status to an error the retry policy can classify
fn error_for_status(status: StatusCode, body: String, model: String) -> LLMError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => LLMError::AuthenticationFailed,
        StatusCode::TOO_MANY_REQUESTS => LLMError::RateLimitExceeded(body),
        StatusCode::BAD_REQUEST => LLMError::InvalidRequest(body),
        StatusCode::NOT_FOUND => LLMError::ModelNotFound(model),
        _ => LLMError::RequestFailed(format!("HTTP {status}: {body}")),
    }
}

/// Reasoning models (o1, o3-mini, ...) reject a sampling temperature
fn is_reasoning_model(model: &str) -> bool {
    let mut chars = model.chars();
    chars.next() == Some('o') && chars.next().is_some_and(|c| c.is_ascii_digit())
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_completion_tokens: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

impl From<CompletionRequest> for ChatRequest {
    fn from(request: CompletionRequest) -> Self {
        let system = request.system.map(|content| ChatMessage {
            role: "system".to_string(),
            content: Some(content),
        });
        let turns = request.messages.into_iter().map(|msg| ChatMessage {
            role: msg.role.as_str().to_string(),
            content: Some(msg.content),
        });

        let temperature = request
            .temperature
            .filter(|_| !is_reasoning_model(&request.model));

        Self {
            messages: system.into_iter().chain(turns).collect(),
            model: request.model,
            max_completion_tokens: request.max_tokens,
            temperature,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChatMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: usize,
    completion_tokens: usize,
}

impl ChatResponse {
    /// First choice only; extra choices are never requested
    fn into_completion(self) -> Result<CompletionResponse> {
        let usage = self
            .usage
            .map(|u| TokenUsage {
                input_tokens: u.prompt_tokens,
                output_tokens: u.completion_tokens,
            })
            .unwrap_or_default();

        let choice = self
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LLMError::UnexpectedResponse("No choices in response".to_string()))?;

        let stop_reason = stop_reason(choice.finish_reason.as_deref().unwrap_or("stop"));
        debug!(?stop_reason, input = usage.input_tokens, output = usage.output_tokens, "Chat completion");

        Ok(CompletionResponse {
            message: Message::assistant(choice.message.content.unwrap_or_default()),
            stop_reason,
            usage,
        })
    }
}

fn stop_reason(finish_reason: &str) -> StopReason {
    match finish_reason {
        "length" => StopReason::MaxTokens,
        "content_filter" => StopReason::ContentFilter,
        "stop" => StopReason::EndTurn,
        other => {
            debug!(finish_reason = other, "Unknown finish reason");
            StopReason::EndTurn
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_provider_creation() {
        let provider = OpenAIProvider::new("test-key").unwrap();
        assert_eq!(provider.name(), "openai");
        assert_eq!(provider.config().api_base, DEFAULT_OPENAI_API_BASE);
        assert_eq!(provider.config().timeout, DEFAULT_TIMEOUT);
    }

    #[test]
    fn test_empty_key_rejected() {
        let result = OpenAIProvider::new("  ");
        assert!(matches!(result, Err(LLMError::ConfigurationError(_))));
    }

    #[test]
    fn test_compatible_endpoint() {
        let config = OpenAIConfig::new("test-key")
            .with_api_base("http://localhost:8000/v1/")
            .with_timeout(Duration::from_secs(30));

        assert_eq!(config.completions_url(), "http://localhost:8000/v1/chat/completions");
        assert_eq!(config.timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_system_prompt_leads_messages() {
        let request = CompletionRequest::new("gpt-4.1-mini")
            .system("You are an analyst")
            .user("Analyse FPT")
            .max_tokens(500)
            .temperature(0.3);

        let body = serde_json::to_value(ChatRequest::from(request)).unwrap();
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][0]["content"], "You are an analyst");
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["max_completion_tokens"], 500);
        assert!((body["temperature"].as_f64().unwrap() - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_reasoning_model_drops_temperature() {
        let request = CompletionRequest::new("o3-mini").user("hi").temperature(0.7);

        let body = serde_json::to_value(ChatRequest::from(request)).unwrap();
        assert!(body.get("temperature").is_none());
        assert!(!is_reasoning_model("gpt-4o"));
    }

    #[test]
    fn test_response_to_completion() {
        let raw = json!({
            "choices": [{
                "message": {"role": "assistant", "content": "Current ratio is healthy."},
                "finish_reason": "length"
            }],
            "usage": {"prompt_tokens": 120, "completion_tokens": 8}
        });

        let chat: ChatResponse = serde_json::from_value(raw).unwrap();
        let response = chat.into_completion().unwrap();

        assert_eq!(response.message.content, "Current ratio is healthy.");
        assert!(response.is_truncated());
        assert_eq!(response.usage.total(), 128);
    }

    #[test]
    fn test_response_without_choices() {
        let chat: ChatResponse = serde_json::from_value(json!({"choices": []})).unwrap();
        assert!(matches!(
            chat.into_completion(),
            Err(LLMError::UnexpectedResponse(_))
        ));
    }

    #[test]
    fn test_error_for_status() {
        let model = || "gpt-x".to_string();
        assert!(matches!(
            error_for_status(StatusCode::UNAUTHORIZED, String::new(), model()),
            LLMError::AuthenticationFailed
        ));
        assert!(matches!(
            error_for_status(StatusCode::NOT_FOUND, String::new(), model()),
            LLMError::ModelNotFound(m) if m == "gpt-x"
        ));

        let overloaded = error_for_status(StatusCode::SERVICE_UNAVAILABLE, "busy".into(), model());
        assert!(overloaded.is_retryable());
        assert!(overloaded.to_string().contains("503"));
    }

    #[test]
    fn test_stop_reason_mapping() {
        assert_eq!(stop_reason("stop"), StopReason::EndTurn);
        assert_eq!(stop_reason("content_filter"), StopReason::ContentFilter);
        assert_eq!(stop_reason("tool_calls"), StopReason::EndTurn);
    }
}
