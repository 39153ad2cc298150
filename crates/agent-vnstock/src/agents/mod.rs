//! Crew agents
//!
//! - [`LlmAgent`]: answers one task with a chat completion, using its crew
//!   profile as the system prompt
//! - [`NewsResearcher`]: collects company news snippets before delegation

pub mod llm_agent;
pub mod news_researcher;

pub use llm_agent::{LlmAgent, LlmSettings};
pub use news_researcher::NewsResearcher;
