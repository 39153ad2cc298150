//! End-to-end analysis run
//!
//! ```text
//! Idle -> Fetching -> Normalizing -> Delegating -> Assembling -> Done
//!   \________\____________\______________\_____________\-> Failed
//! ```
//!
//! Fetching collects the company listing, every statement and the news
//! search results. Normalizing flattens the statements. Delegating runs the
//! analysis and news tasks (sequentially or in parallel), then the executive
//! summary with both of their outputs. Assembling writes the three reports.
//! Any error ends the run in `Failed`, naming the stage it happened in.

use crate::agents::{LlmAgent, LlmSettings, NewsResearcher};
use crate::api::{BraveClient, CompanyInfo, MarketDataSource, SearchProvider, StatementSource};
use crate::config::AnalystConfig;
use crate::context::AnalysisContext;
use crate::crew::{CrewDefinition, NEWS_TASK, SUMMARY_TASK};
use crate::error::{AnalystError, Result};
use crate::report::{Narratives, ReportArtifact, ReportAssembler};
use crate::statement::{ColumnNormalizer, RawStatement, StatementKind, flatten};
use agent_core::Agent;
use agent_llm::LLMProvider;
use agent_llm::providers::{OpenAIConfig, OpenAIProvider};
use agent_workflow::{Task, Workflow, WorkflowOutput};
use futures::future::try_join_all;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{Instrument, info, info_span, warn};
use uuid::Uuid;

/// Where a run is, or where it stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStage {
    Idle,
    Fetching,
    Normalizing,
    Delegating,
    Assembling,
    Done,
    Failed,
}

impl fmt::Display for RunStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Idle => "idle",
            Self::Fetching => "fetching",
            Self::Normalizing => "normalizing",
            Self::Delegating => "delegating",
            Self::Assembling => "assembling",
            Self::Done => "done",
            Self::Failed => "failed",
        })
    }
}

/// A run that ended in `Failed`
#[derive(Debug, Error)]
#[error("run failed while {stage}: {source}")]
pub struct RunFailed {
    /// Stage that was active when the error occurred
    pub stage: RunStage,
    #[source]
    pub source: AnalystError,
}

fn failed_at(stage: RunStage) -> impl FnOnce(AnalystError) -> RunFailed {
    move |source| RunFailed { stage, source }
}

/// Outcome of a completed run
#[derive(Debug, Clone)]
pub struct AnalysisRun {
    pub run_id: String,
    pub context: Arc<AnalysisContext>,
    pub narratives: Narratives,
    pub artifacts: Vec<ReportArtifact>,
}

/// Fetch, normalize, delegate and assemble for one symbol at a time
///
/// Holds no per-run state, so one pipeline can serve several runs as long as
/// they write to different output directories.
pub struct AnalysisPipeline {
    config: AnalystConfig,
    source: Arc<dyn StatementSource>,
    researcher: NewsResearcher,
    normalizer: ColumnNormalizer,
    crew: CrewDefinition,
    agents: HashMap<String, Arc<dyn Agent>>,
    assembler: ReportAssembler,
}

impl AnalysisPipeline {
    /// Pipeline over the given collaborators
    ///
    /// `config` is validated here, before anything is fetched.
    pub fn new(
        config: AnalystConfig,
        source: Arc<dyn StatementSource>,
        search: Arc<dyn SearchProvider>,
        provider: Arc<dyn LLMProvider>,
    ) -> Result<Self> {
        config.validate()?;
        let normalizer = ColumnNormalizer::load(config.labels_path.as_deref())?;
        Self::with_normalizer(config, normalizer, source, search, provider)
    }

    /// Pipeline over VCI/TCBS, Brave and an OpenAI-compatible endpoint
    pub fn from_config(config: AnalystConfig) -> Result<Self> {
        config.validate()?;
        let normalizer = ColumnNormalizer::load(config.labels_path.as_deref())?;

        let source = Arc::new(MarketDataSource::from_config(&config, normalizer.clone())?);
        let search = Arc::new(BraveClient::new(
            config.brave_api_key.clone().unwrap_or_default(),
            config.request_timeout,
        )?);
        let openai = OpenAIConfig::new(config.openai_api_key.clone().unwrap_or_default())
            .with_api_base(&config.llm_api_base)
            .with_timeout(config.llm_timeout);
        let provider = Arc::new(
            OpenAIProvider::with_config(openai)
                .map_err(|e| AnalystError::Configuration(e.to_string()))?,
        );

        Self::with_normalizer(config, normalizer, source, search, provider)
    }

    fn with_normalizer(
        config: AnalystConfig,
        normalizer: ColumnNormalizer,
        source: Arc<dyn StatementSource>,
        search: Arc<dyn SearchProvider>,
        provider: Arc<dyn LLMProvider>,
    ) -> Result<Self> {
        let crew = CrewDefinition::load(config.crew_path.as_deref())?;
        let settings = LlmSettings {
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        };

        let agents = crew
            .agents()
            .map(|(name, profile)| {
                let agent: Arc<dyn Agent> =
                    Arc::new(LlmAgent::new(name, provider.clone(), profile, settings.clone()));
                (name.to_string(), agent)
            })
            .collect();

        Ok(Self {
            researcher: NewsResearcher::new(search, config.search_results),
            assembler: ReportAssembler::from_config(&config)?,
            config,
            source,
            normalizer,
            crew,
            agents,
        })
    }

    pub fn config(&self) -> &AnalystConfig {
        &self.config
    }

    /// Analyze `symbol` and write the reports
    pub async fn run(&self, symbol: &str) -> std::result::Result<AnalysisRun, RunFailed> {
        let symbol = symbol.trim().to_uppercase();
        let run_id = Uuid::new_v4().to_string();
        let span = info_span!("analysis_run", run_id = %run_id, symbol = %symbol);

        async {
            let result = self.run_stages(&symbol, &run_id).await;
            match &result {
                Ok(run) => info!(stage = %RunStage::Done, artifacts = run.artifacts.len(), "Run complete"),
                Err(e) => warn!(stage = %RunStage::Failed, failed_stage = %e.stage, error = %e.source, "Run failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn run_stages(&self, symbol: &str, run_id: &str) -> std::result::Result<AnalysisRun, RunFailed> {
        if symbol.is_empty() {
            return Err(failed_at(RunStage::Idle)(AnalystError::Configuration(
                "stock symbol must not be empty".to_string(),
            )));
        }

        info!(stage = %RunStage::Fetching, "Fetching data");
        let (company, raw) = self.fetch(symbol).await.map_err(failed_at(RunStage::Fetching))?;
        let intelligence = self
            .researcher
            .gather(&company)
            .await
            .map_err(failed_at(RunStage::Fetching))?;

        info!(stage = %RunStage::Normalizing, statements = raw.len(), "Normalizing statements");
        let statements = raw
            .iter()
            .map(|statement| Ok((statement.kind(), flatten(statement, &self.normalizer)?)))
            .collect::<Result<HashMap<_, _>>>()
            .map_err(failed_at(RunStage::Normalizing))?;
        let context = Arc::new(AnalysisContext::new(symbol, company, statements, intelligence));

        info!(stage = %RunStage::Delegating, mode = %self.config.execution_mode, "Delegating to agents");
        let narratives = self
            .delegate(&context, run_id)
            .await
            .map_err(failed_at(RunStage::Delegating))?;

        info!(stage = %RunStage::Assembling, "Assembling reports");
        let artifacts = self
            .assembler
            .assemble(&context, &narratives, self.config.analysis_type)
            .map_err(failed_at(RunStage::Assembling))?;

        Ok(AnalysisRun {
            run_id: run_id.to_string(),
            context,
            narratives,
            artifacts,
        })
    }

    /// Company listing (degrading to the symbol) and every statement
    async fn fetch(&self, symbol: &str) -> Result<(CompanyInfo, Vec<RawStatement>)> {
        let company = match self.source.company(symbol).await {
            Ok(company) => company,
            Err(e) => {
                warn!(error = %e, "Company lookup failed, using the symbol as name");
                CompanyInfo::fallback(symbol)
            }
        };
        info!(company = %company.name, industry = %company.industry, "Company resolved");

        let statements = try_join_all(
            StatementKind::ALL
                .iter()
                .map(|kind| self.source.fetch(symbol, *kind)),
        )
        .await?;

        Ok((company, statements))
    }

    async fn delegate(&self, context: &AnalysisContext, run_id: &str) -> Result<Narratives> {
        let vars = context.template_vars();
        let analysis_task = self.config.analysis_type.task_name();

        let research = Workflow::builder("research")
            .mode(self.config.execution_mode)
            .retry(self.config.retry_policy())
            .task(self.task(analysis_task, &vars)?)
            .task(self.task(NEWS_TASK, &vars)?)
            .build()?;
        let research_output = research
            .execute(context.agent_context(run_id, self.config.analysis_type))
            .await?;

        let synthesis = Workflow::builder("synthesis")
            .retry(self.config.retry_policy())
            .task(self.task(SUMMARY_TASK, &vars)?)
            .build()?;
        let synthesis_output = synthesis.execute(research_output.context.clone()).await?;

        Ok(Narratives {
            analysis: output_of(&research_output, analysis_task)?,
            news: output_of(&research_output, NEWS_TASK)?,
            executive_summary: output_of(&synthesis_output, SUMMARY_TASK)?,
        })
    }

    fn task(&self, name: &str, vars: &serde_json::Value) -> Result<Task> {
        let definition = self.crew.task(name)?;
        let agent = self.agents.get(&definition.agent).cloned().ok_or_else(|| {
            AnalystError::invalid("crew", format!("unknown agent '{}'", definition.agent))
        })?;
        Ok(Task::new(name, self.crew.render_task(name, vars)?, agent))
    }
}

fn output_of(output: &WorkflowOutput, task: &str) -> Result<String> {
    output
        .output(task)
        .map(str::to_string)
        .ok_or_else(|| AnalystError::DelegationFailed {
            task: task.to_string(),
            reason: "no output recorded".to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::SearchResult;
    use crate::report::ArtifactKind;
    use agent_llm::{
        CompletionRequest, CompletionResponse, LLMError, Message, StopReason, TokenUsage,
    };
    use agent_workflow::ExecutionMode;
    use async_trait::async_trait;
    use std::path::Path;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::tempdir;

    #[derive(Default)]
    struct FakeSource {
        fetches: AtomicUsize,
        fail_on: Option<StatementKind>,
        unknown_label: bool,
    }

    #[async_trait]
    impl StatementSource for FakeSource {
        async fn fetch(&self, symbol: &str, kind: StatementKind) -> Result<RawStatement> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            if self.fail_on == Some(kind) {
                return Err(AnalystError::unavailable(symbol, kind, "HTTP 503"));
            }

            let periods = vec!["2023".to_string(), "2022".to_string()];
            match kind {
                StatementKind::Ratios => {
                    let metric = if self.unknown_label { "Mystery Ratio" } else { "Quick Ratio" };
                    RawStatement::new(kind, periods)
                        .with_column("Thanh khoản", "Current Ratio", vec![Some(1.8), Some(1.6)])?
                        .with_column("Thanh khoản", metric, vec![Some(1.2), Some(1.1)])
                }
                StatementKind::IncomeStatement => RawStatement::new(kind, periods).with_column(
                    "Income Statement",
                    "Net Sales",
                    vec![Some(8_570_000_000_000.0), Some(9_370_000_000_000.0)],
                ),
                _ => Ok(RawStatement::new(kind, Vec::new())),
            }
        }

        async fn company(&self, symbol: &str) -> Result<CompanyInfo> {
            Err(AnalystError::unavailable(symbol, "listing", "not listed"))
        }

        fn name(&self) -> &str {
            "fake"
        }
    }

    struct FakeSearch;

    #[async_trait]
    impl SearchProvider for FakeSearch {
        async fn search(&self, query: &str, _count: usize) -> Result<Vec<SearchResult>> {
            Ok(vec![SearchResult {
                title: format!("Result for {query}"),
                url: format!("https://example.vn/{}", query.len()),
                description: "snippet".into(),
                age: None,
            }])
        }

        fn name(&self) -> &str {
            "fake"
        }
    }

    /// Answers every request with a short text naming the agent role
    #[derive(Default)]
    struct FakeProvider {
        requests: Mutex<Vec<CompletionRequest>>,
        reject: bool,
    }

    #[async_trait]
    impl LLMProvider for FakeProvider {
        async fn complete(&self, request: CompletionRequest) -> agent_llm::Result<CompletionResponse> {
            if self.reject {
                return Err(LLMError::AuthenticationFailed);
            }
            let role = request
                .system
                .as_deref()
                .and_then(|s| s.lines().next())
                .unwrap_or_default()
                .to_string();
            self.requests.lock().unwrap().push(request);

            Ok(CompletionResponse {
                message: Message::assistant(format!("Narrative from: {role}")),
                stop_reason: StopReason::EndTurn,
                usage: TokenUsage::default(),
            })
        }

        fn name(&self) -> &str {
            "fake"
        }
    }

    fn config(dir: &Path, mode: ExecutionMode) -> AnalystConfig {
        AnalystConfig::builder()
            .openai_api_key("sk-test")
            .brave_api_key("brave-test")
            .output_dir(dir)
            .execution_mode(mode)
            .max_attempts(1)
            .build()
            .unwrap()
    }

    fn file_names(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[tokio::test]
    async fn test_missing_credential_fails_before_fetch() {
        let dir = tempdir().unwrap();
        let source = Arc::new(FakeSource::default());
        let config = AnalystConfig {
            brave_api_key: Some("brave-test".into()),
            output_dir: dir.path().to_path_buf(),
            ..AnalystConfig::default()
        };

        let result = AnalysisPipeline::new(
            config,
            source.clone(),
            Arc::new(FakeSearch),
            Arc::new(FakeProvider::default()),
        );

        assert!(matches!(result, Err(AnalystError::Configuration(ref m)) if m.contains("OPENAI_API_KEY")));
        assert_eq!(source.fetches.load(Ordering::SeqCst), 0);
        assert!(file_names(dir.path()).is_empty());
    }

    async fn successful_run(mode: ExecutionMode) {
        let dir = tempdir().unwrap();
        let provider = Arc::new(FakeProvider::default());
        let pipeline = AnalysisPipeline::new(
            config(dir.path(), mode),
            Arc::new(FakeSource::default()),
            Arc::new(FakeSearch),
            provider.clone(),
        )
        .unwrap();

        let run = pipeline.run(" ree ").await.unwrap();

        assert_eq!(run.context.symbol(), "REE");
        assert_eq!(run.context.company().name, "REE");
        assert_eq!(run.artifacts.len(), 3);
        for artifact in &run.artifacts {
            assert!(!artifact.content.trim().is_empty());
        }
        assert_eq!(
            file_names(dir.path()),
            vec!["executive_summary.md", "news.md", "report.md"]
        );

        let report = &run.artifacts[0];
        assert_eq!(report.kind, ArtifactKind::Report);
        assert!(report.content.contains("Narrative from: You are a Senior Financial Data Analyst."));
        assert!(report.content.contains("Liquidity_Current_Ratio"));
        assert!(report.content.contains("Income_Revenue_VND"));

        let requests = provider.requests.lock().unwrap();
        assert_eq!(requests.len(), 3);
        let summary_prompt = &requests[2].messages[0].content;
        assert!(summary_prompt.contains("### financial_analysis"));
        assert!(summary_prompt.contains("### news_research"));
    }

    #[tokio::test]
    async fn test_successful_run_sequential() {
        successful_run(ExecutionMode::Sequential).await;
    }

    #[tokio::test]
    async fn test_successful_run_parallel() {
        successful_run(ExecutionMode::Parallel).await;
    }

    #[tokio::test]
    async fn test_sequential_news_task_sees_analysis() {
        let dir = tempdir().unwrap();
        let provider = Arc::new(FakeProvider::default());
        let pipeline = AnalysisPipeline::new(
            config(dir.path(), ExecutionMode::Sequential),
            Arc::new(FakeSource::default()),
            Arc::new(FakeSearch),
            provider.clone(),
        )
        .unwrap();
        pipeline.run("REE").await.unwrap();

        let requests = provider.requests.lock().unwrap();
        assert!(!requests[0].messages[0].content.contains("### "));
        assert!(requests[1].messages[0].content.contains("### financial_analysis"));
    }

    #[tokio::test]
    async fn test_fetch_failure_names_stage_and_writes_nothing() {
        let dir = tempdir().unwrap();
        let source = Arc::new(FakeSource {
            fail_on: Some(StatementKind::CashFlow),
            ..FakeSource::default()
        });
        let pipeline = AnalysisPipeline::new(
            config(dir.path(), ExecutionMode::Sequential),
            source,
            Arc::new(FakeSearch),
            Arc::new(FakeProvider::default()),
        )
        .unwrap();

        let err = pipeline.run("REE").await.unwrap_err();
        assert_eq!(err.stage, RunStage::Fetching);
        assert!(matches!(err.source, AnalystError::DataUnavailable { ref kind, .. } if kind == "cash_flow"));
        assert!(file_names(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn test_unmapped_label_fails_normalizing() {
        let dir = tempdir().unwrap();
        let source = Arc::new(FakeSource {
            unknown_label: true,
            ..FakeSource::default()
        });
        let pipeline = AnalysisPipeline::new(
            config(dir.path(), ExecutionMode::Sequential),
            source,
            Arc::new(FakeSearch),
            Arc::new(FakeProvider::default()),
        )
        .unwrap();

        let err = pipeline.run("REE").await.unwrap_err();
        assert_eq!(err.stage, RunStage::Normalizing);
        assert!(matches!(err.source, AnalystError::UnmappedLabel { .. }));
    }

    #[tokio::test]
    async fn test_rejected_completion_fails_delegating() {
        let dir = tempdir().unwrap();
        let provider = Arc::new(FakeProvider {
            reject: true,
            ..FakeProvider::default()
        });
        let pipeline = AnalysisPipeline::new(
            config(dir.path(), ExecutionMode::Parallel),
            Arc::new(FakeSource::default()),
            Arc::new(FakeSearch),
            provider,
        )
        .unwrap();

        let err = pipeline.run("REE").await.unwrap_err();
        assert_eq!(err.stage, RunStage::Delegating);
        assert!(matches!(err.source, AnalystError::DelegationFailed { .. }));
        assert!(file_names(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn test_empty_symbol_rejected() {
        let dir = tempdir().unwrap();
        let pipeline = AnalysisPipeline::new(
            config(dir.path(), ExecutionMode::Sequential),
            Arc::new(FakeSource::default()),
            Arc::new(FakeSearch),
            Arc::new(FakeProvider::default()),
        )
        .unwrap();

        let err = pipeline.run("  ").await.unwrap_err();
        assert_eq!(err.stage, RunStage::Idle);
    }
}
