//! LLM-backed crew agent (no tools)

use crate::crew::AgentProfile;
use agent_core::{Agent, Context, Error, Result};
use agent_llm::{CompletionRequest, LLMProvider, StopReason};
use agent_prompt::PromptBuilder;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

/// Completion settings for one agent
#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub model: String,
    pub max_tokens: usize,
    pub temperature: f32,
}

/// Agent answering a task with a single completion
///
/// The profile becomes the system prompt; the task description is the user
/// message, followed by the outputs of earlier tasks found in the context.
pub struct LlmAgent {
    name: String,
    provider: Arc<dyn LLMProvider>,
    system_prompt: String,
    settings: LlmSettings,
}

impl LlmAgent {
    /// Profile limits override the shared `settings`
    pub fn new(
        name: impl Into<String>,
        provider: Arc<dyn LLMProvider>,
        profile: &AgentProfile,
        mut settings: LlmSettings,
    ) -> Self {
        if let Some(max_tokens) = profile.max_tokens {
            settings.max_tokens = max_tokens;
        }
        if let Some(temperature) = profile.temperature {
            settings.temperature = temperature;
        }

        Self {
            name: name.into(),
            provider,
            system_prompt: profile.system_prompt(),
            settings,
        }
    }

    pub fn settings(&self) -> &LlmSettings {
        &self.settings
    }

    fn user_message(input: String, context: &Context) -> String {
        if !context.has_outputs() {
            return input;
        }

        context
            .task_outputs()
            .into_iter()
            .fold(
                PromptBuilder::new()
                    .text(input)
                    .blank_line()
                    .text("# Results of earlier tasks\n"),
                |builder, (task, output)| {
                    builder
                        .text(format!("\n### {task}\n\n"))
                        .text(output.trim())
                        .newline()
                },
            )
            .build()
    }
}

#[async_trait]
impl Agent for LlmAgent {
    async fn process(&self, input: String, context: &mut Context) -> Result<String> {
        let request = CompletionRequest::new(&self.settings.model)
            .system(self.system_prompt.clone())
            .user(Self::user_message(input, context))
            .max_tokens(self.settings.max_tokens)
            .temperature(self.settings.temperature);

        let response = self.provider.complete(request).await?;
        debug!(
            agent = %self.name,
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            "Completion received"
        );

        match response.stop_reason {
            StopReason::MaxTokens => warn!(agent = %self.name, "Completion truncated at max_tokens"),
            StopReason::ContentFilter => {
                return Err(Error::Rejected(format!(
                    "{} output withheld by the content filter",
                    self.name
                )));
            }
            StopReason::EndTurn => {}
        }

        response
            .text()
            .map(|text| text.trim().to_string())
            .ok_or_else(|| Error::ProcessingFailed(format!("{} returned an empty completion", self.name)))
    }

    fn name(&self) -> &str {
        &self.name
    }
}
