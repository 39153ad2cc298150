//! Workflow definition and execution

use crate::{Result, RetryPolicy, WorkflowError};
use agent_core::{Agent, Context};
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, info_span, Instrument};

/// How the tasks of a workflow are scheduled
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    /// One task at a time; later tasks see earlier outputs
    #[default]
    Sequential,
    /// All tasks at once; tasks see only the initial context
    Parallel,
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Sequential => "sequential",
            Self::Parallel => "parallel",
        })
    }
}

impl FromStr for ExecutionMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sequential" => Ok(Self::Sequential),
            "parallel" => Ok(Self::Parallel),
            other => Err(format!(
                "unknown execution mode '{other}' (expected sequential or parallel)"
            )),
        }
    }
}

/// A unit of delegated work: a description handed to an agent
#[derive(Clone)]
pub struct Task {
    pub name: String,
    pub description: String,
    pub agent: Arc<dyn Agent>,
}

impl Task {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        agent: Arc<dyn Agent>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            agent,
        }
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("name", &self.name)
            .field("agent", &self.agent.name())
            .finish_non_exhaustive()
    }
}

/// Text produced by one task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskOutput {
    pub task: String,
    pub agent: String,
    pub output: String,
}

/// Result of a workflow run
#[derive(Debug, Clone)]
pub struct WorkflowOutput {
    /// Outputs in task declaration order, whatever the execution mode
    pub outputs: Vec<TaskOutput>,
    /// Initial context plus every task output
    pub context: Context,
}

impl WorkflowOutput {
    pub fn output(&self, task: &str) -> Option<&str> {
        self.outputs
            .iter()
            .find(|o| o.task == task)
            .map(|o| o.output.as_str())
    }
}

/// A named list of tasks run under one execution mode and retry policy
///
/// ```no_run
/// use agent_workflow::{ExecutionMode, Task, Workflow};
/// # use std::sync::Arc;
/// # async fn example(analyst: Arc<dyn agent_core::Agent>, researcher: Arc<dyn agent_core::Agent>) -> agent_workflow::Result<()> {
/// let workflow = Workflow::builder("research")
///     .mode(ExecutionMode::Parallel)
///     .task(Task::new("financial_analysis", "Analyse REE ratios", analyst))
///     .task(Task::new("news_research", "Find REE news", researcher))
///     .build()?;
///
/// let output = workflow.execute(agent_core::Context::new()).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Workflow {
    name: String,
    tasks: Vec<Task>,
    mode: ExecutionMode,
    retry: RetryPolicy,
}

impl Workflow {
    pub fn builder(name: impl Into<String>) -> WorkflowBuilder {
        WorkflowBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Run every task and collect their outputs
    pub async fn execute(&self, context: Context) -> Result<WorkflowOutput> {
        let span = info_span!("workflow", name = %self.name, mode = %self.mode);
        async move {
            info!(tasks = self.tasks.len(), "Starting workflow");
            let started = Instant::now();

            let output = match self.mode {
                ExecutionMode::Sequential => self.run_sequential(context).await?,
                ExecutionMode::Parallel => self.run_parallel(context).await?,
            };

            info!(elapsed_ms = started.elapsed().as_millis() as u64, "Workflow finished");
            Ok(output)
        }
        .instrument(span)
        .await
    }

    async fn run_sequential(&self, mut context: Context) -> Result<WorkflowOutput> {
        let mut outputs = Vec::with_capacity(self.tasks.len());

        for task in &self.tasks {
            let output = self.run_task(task, &context).await?;
            context.record_output(&task.name, &output.output);
            outputs.push(output);
        }

        Ok(WorkflowOutput { outputs, context })
    }

    async fn run_parallel(&self, mut context: Context) -> Result<WorkflowOutput> {
        let runs = self.tasks.iter().map(|task| self.run_task(task, &context));
        let outputs = try_join_all(runs).await?;
        for output in &outputs {
            context.record_output(&output.task, &output.output);
        }

        Ok(WorkflowOutput { outputs, context })
    }

    async fn run_task(&self, task: &Task, context: &Context) -> Result<TaskOutput> {
        let span = info_span!("task", task = %task.name, agent = %task.agent.name());
        async {
            info!("Delegating task");
            let started = Instant::now();

            let output = self
                .retry
                .execute(&task.name, || {
                    let mut attempt_context = context.clone();
                    let description = task.description.clone();
                    let agent = task.agent.clone();
                    async move { agent.process(description, &mut attempt_context).await }
                })
                .await
                .map_err(|source| WorkflowError::TaskFailed {
                    task: task.name.clone(),
                    source,
                })?;

            info!(
                chars = output.len(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Task complete"
            );
            Ok(TaskOutput {
                task: task.name.clone(),
                agent: task.agent.name().to_string(),
                output,
            })
        }
        .instrument(span)
        .await
    }
}

/// Builder for constructing workflows
pub struct WorkflowBuilder {
    name: String,
    tasks: Vec<Task>,
    mode: ExecutionMode,
    retry: RetryPolicy,
}

impl WorkflowBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tasks: Vec::new(),
            mode: ExecutionMode::default(),
            retry: RetryPolicy::default(),
        }
    }

    pub fn mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn task(mut self, task: Task) -> Self {
        self.tasks.push(task);
        self
    }

    pub fn tasks(mut self, tasks: impl IntoIterator<Item = Task>) -> Self {
        self.tasks.extend(tasks);
        self
    }

    /// Build the workflow; task names must be unique and non-empty
    pub fn build(self) -> Result<Workflow> {
        if self.tasks.is_empty() {
            return Err(WorkflowError::Empty(self.name));
        }

        let mut seen = HashSet::new();
        if let Some(dup) = self.tasks.iter().find(|t| !seen.insert(t.name.as_str())) {
            return Err(WorkflowError::DuplicateTask {
                workflow: self.name.clone(),
                task: dup.name.clone(),
            });
        }

        Ok(Workflow {
            name: self.name,
            tasks: self.tasks,
            mode: self.mode,
            retry: self.retry,
        })
    }
}
