//! Completion request and response types
//!
//! Agents send one task per request: an optional system prompt with the
//! agent profile, then the user turn carrying the rendered task.

use crate::Message;
use serde::{Deserialize, Serialize};

/// Generation budget used when the caller sets none
pub const DEFAULT_MAX_TOKENS: usize = 1024;

/// A single chat completion call
///
/// ```
/// use agent_llm::CompletionRequest;
///
/// let request = CompletionRequest::new("gpt-4.1-mini")
///     .system("You are a financial analyst")
///     .user("Assess the liquidity of REE")
///     .max_tokens(800);
/// assert_eq!(request.messages.len(), 1);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub model: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    pub messages: Vec<Message>,

    pub max_tokens: usize,

    /// Ignored by reasoning models
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

impl CompletionRequest {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            system: None,
            messages: Vec::new(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: None,
        }
    }

    pub fn system(mut self, prompt: impl Into<String>) -> Self {
        self.system = Some(prompt.into());
        self
    }

    /// Append a user turn
    pub fn user(mut self, text: impl Into<String>) -> Self {
        self.messages.push(Message::user(text));
        self
    }

    pub fn message(mut self, message: Message) -> Self {
        self.messages.push(message);
        self
    }

    pub fn max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// What the provider sent back
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResponse {
    pub message: Message,
    pub stop_reason: StopReason,
    pub usage: TokenUsage,
}

impl CompletionResponse {
    /// Finished text, `None` when the provider returned only whitespace
    pub fn text(&self) -> Option<&str> {
        self.message.text()
    }

    pub fn is_truncated(&self) -> bool {
        self.stop_reason == StopReason::MaxTokens
    }
}

/// Why generation stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    EndTurn,
    MaxTokens,
    /// Output withheld by the provider's content filter
    ContentFilter,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: usize,
    pub output_tokens: usize,
}

impl TokenUsage {
    pub fn total(&self) -> usize {
        self.input_tokens + self.output_tokens
    }
}
