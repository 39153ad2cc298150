//! Agent profiles and task definitions
//!
//! The crew is described in YAML: named agents with a role, goal and
//! backstory, and named tasks whose descriptions are MiniJinja templates
//! bound to one agent. A built-in crew ships with the crate; a file given in
//! configuration replaces it.

use crate::config::AnalysisType;
use crate::error::{AnalystError, Result};
use agent_prompt::{JinjaTemplate, PromptBuilder, PromptRegistry};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

const BUILTIN_CREW: &str = include_str!("../data/crew.yaml");

pub const NEWS_TASK: &str = "news_research";
pub const SUMMARY_TASK: &str = "executive_summary";

/// Persona an LLM agent is given as its system prompt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AgentProfile {
    pub role: String,
    pub goal: String,
    pub backstory: String,
    /// Overrides the configured limit for this agent
    #[serde(default)]
    pub max_tokens: Option<usize>,
    #[serde(default)]
    pub temperature: Option<f32>,
}

impl AgentProfile {
    pub fn system_prompt(&self) -> String {
        PromptBuilder::new()
            .text(format!("You are a {}.", self.role))
            .blank_line()
            .field("Goal", &self.goal)
            .newline()
            .text(self.backstory.trim())
            .blank_line()
            .text("Answer in markdown. Base every figure on the data you are given.")
            .build()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaskDefinition {
    pub agent: String,
    pub description: String,
    pub expected_output: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CrewFile {
    agents: BTreeMap<String, AgentProfile>,
    tasks: BTreeMap<String, TaskDefinition>,
}

/// Validated crew with its task templates compiled
#[derive(Debug)]
pub struct CrewDefinition {
    agents: BTreeMap<String, AgentProfile>,
    tasks: BTreeMap<String, TaskDefinition>,
    templates: PromptRegistry,
}

impl CrewDefinition {
    pub fn builtin() -> Result<Self> {
        Self::from_yaml_str(BUILTIN_CREW)
    }

    /// The file at `path`, or the built-in crew
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                let text = std::fs::read_to_string(path).map_err(|e| {
                    AnalystError::invalid(format!("crew file {}", path.display()), e.to_string())
                })?;
                debug!(path = %path.display(), "Loading crew definition");
                Self::from_yaml_str(&text)
            }
            None => Self::builtin(),
        }
    }

    /// Parse and check that every task the pipeline runs exists and names a
    /// known agent
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let file: CrewFile = serde_yaml::from_str(text)?;

        let templates = PromptRegistry::new();
        for (name, task) in &file.tasks {
            if !file.agents.contains_key(&task.agent) {
                return Err(AnalystError::invalid(
                    format!("task '{name}'"),
                    format!("unknown agent '{}'", task.agent),
                ));
            }
            templates.register(JinjaTemplate::new(name.as_str(), task.description.as_str())?);
        }

        let required = [
            AnalysisType::Comprehensive.task_name(),
            AnalysisType::Profitability.task_name(),
            AnalysisType::Liquidity.task_name(),
            NEWS_TASK,
            SUMMARY_TASK,
        ];
        if let Some(missing) = required.iter().find(|t| !file.tasks.contains_key(**t)) {
            return Err(AnalystError::invalid("crew", format!("missing task '{missing}'")));
        }

        Ok(Self {
            agents: file.agents,
            tasks: file.tasks,
            templates,
        })
    }

    pub fn agent(&self, name: &str) -> Result<&AgentProfile> {
        self.agents
            .get(name)
            .ok_or_else(|| AnalystError::invalid("crew", format!("unknown agent '{name}'")))
    }

    pub fn agents(&self) -> impl Iterator<Item = (&str, &AgentProfile)> {
        self.agents.iter().map(|(name, profile)| (name.as_str(), profile))
    }

    pub fn task(&self, name: &str) -> Result<&TaskDefinition> {
        self.tasks
            .get(name)
            .ok_or_else(|| AnalystError::invalid("crew", format!("unknown task '{name}'")))
    }

    /// Task description rendered with `vars`, followed by the expected output
    pub fn render_task(&self, name: &str, vars: &serde_json::Value) -> Result<String> {
        let task = self.task(name)?;
        let description = self.templates.render(name, vars)?;

        Ok(PromptBuilder::new()
            .text(description.trim_end())
            .blank_line()
            .field("Expected output", &task.expected_output)
            .build())
    }
}
