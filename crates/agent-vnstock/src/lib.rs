//! Financial analysis reports for Vietnamese listed stocks
//!
//! This crate turns a ticker into three markdown reports. It includes:
//!
//! - Financial statements from VCI (ratios, income statement, balance sheet,
//!   cash flow) and dividend history from TCBS
//! - Normalization of vendor `(Category, Metric)` column labels, Vietnamese or
//!   English, into flat English keys such as `Liquidity_Current_Ratio`,
//!   driven by an editable YAML label table
//! - Company news gathered through Brave web search
//! - A crew of LLM agents (financial analyst, news researcher, report writer)
//!   described in YAML and run through `agent_workflow`
//! - Report assembly into `report.md`, `news.md` and `executive_summary.md`
//!
//! # Architecture
//!
//! [`AnalysisPipeline`] owns one run from fetch to files. Its collaborators sit
//! behind traits ([`StatementSource`], [`SearchProvider`],
//! [`agent_llm::LLMProvider`]) so they can be swapped for canned ones.
//!
//! # Example
//!
//! ```rust,no_run
//! use agent_vnstock::{AnalysisPipeline, AnalystConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = AnalystConfig::from_env()?;
//!     let pipeline = AnalysisPipeline::from_config(config)?;
//!
//!     let run = pipeline.run("REE").await?;
//!     for artifact in &run.artifacts {
//!         println!("{}", artifact.path.display());
//!     }
//!     Ok(())
//! }
//! ```

pub mod agents;
pub mod api;
pub mod cache;
pub mod cleanup;
pub mod config;
pub mod context;
pub mod crew;
pub mod error;
pub mod pipeline;
pub mod report;
pub mod statement;

pub use api::{CompanyInfo, MarketDataSource, SearchProvider, SearchResult, StatementSource};
pub use cleanup::clean_reports;
pub use config::{AnalysisType, AnalystConfig, AnalystConfigBuilder, ReportPeriod};
pub use context::{AnalysisContext, MarketIntelligence};
pub use crew::CrewDefinition;
pub use error::{AnalystError, Result};
pub use pipeline::{AnalysisPipeline, AnalysisRun, RunFailed, RunStage};
pub use report::{ArtifactKind, Narratives, ReportArtifact, ReportAssembler};
pub use statement::{
    ColumnLabel, ColumnNormalizer, NormalizedStatement, RawStatement, StatementKind, expand,
    flatten,
};
