//! LLM provider abstraction layer
//!
//! Provider-agnostic message and completion types, the [`LLMProvider`] trait
//! and an OpenAI-compatible chat-completions provider (feature `openai`).

pub mod completion;
pub mod error;
pub mod messages;
pub mod provider;

pub use completion::{
    CompletionRequest, CompletionResponse, DEFAULT_MAX_TOKENS, StopReason, TokenUsage,
};
pub use error::{LLMError, Result};
pub use messages::{Message, Role};
pub use provider::LLMProvider;

#[cfg(feature = "openai")]
pub mod providers;
