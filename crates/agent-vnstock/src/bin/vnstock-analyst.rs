//! Vietnamese stock analyst CLI
//!
//! ```bash
//! # Credentials (or put them in .env)
//! export OPENAI_API_KEY="sk-..."
//! export BRAVE_API_KEY="..."
//!
//! # Full analysis: writes report.md, news.md and executive_summary.md
//! cargo run --bin vnstock-analyst -- analyze REE --analysis-type liquidity
//!
//! # One normalized statement, no LLM involved
//! cargo run --bin vnstock-analyst -- normalize REE --kind ratios
//!
//! # Remove generated reports
//! cargo run --bin vnstock-analyst -- clean
//! ```

use agent_prompt::Language;
use agent_utils::{LogFormat, init_tracing};
use agent_vnstock::statement::markdown_table;
use agent_vnstock::{
    AnalysisPipeline, AnalysisType, AnalystConfig, ColumnNormalizer, MarketDataSource,
    ReportPeriod, StatementKind, StatementSource, clean_reports, flatten,
};
use agent_workflow::ExecutionMode;
use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "vnstock-analyst", version, about = "Financial analysis reports for Vietnamese stocks")]
struct Cli {
    /// Log output format
    #[arg(long, global = true, default_value = "text", env = "ANALYST_LOG_FORMAT")]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Fetch data, run the agents and write the reports
    Analyze(AnalyzeArgs),
    /// Print one normalized statement as a markdown table
    Normalize(NormalizeArgs),
    /// Delete generated reports and leftover lock/temp files
    Clean {
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
}

/// Options shared by commands that fetch data
#[derive(Debug, Args)]
struct DataArgs {
    /// Statement period
    #[arg(long)]
    period: Option<ReportPeriod>,

    /// Language of vendor labels (en or vi)
    #[arg(long)]
    language: Option<Language>,

    /// Label table YAML replacing the built-in one
    #[arg(long, value_name = "FILE")]
    labels: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct AnalyzeArgs {
    /// Stock symbol, e.g. REE
    symbol: String,

    #[arg(long)]
    analysis_type: Option<AnalysisType>,

    /// Run the analysis and news tasks sequentially or in parallel
    #[arg(long)]
    mode: Option<ExecutionMode>,

    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// LLM model name
    #[arg(long)]
    model: Option<String>,

    /// Crew YAML replacing the built-in agents and tasks
    #[arg(long, value_name = "FILE")]
    crew: Option<PathBuf>,

    /// Directory of <name>.md.j2 report templates
    #[arg(long, value_name = "DIR")]
    templates: Option<PathBuf>,

    #[command(flatten)]
    data: DataArgs,
}

#[derive(Debug, Args)]
struct NormalizeArgs {
    symbol: String,

    #[arg(long, default_value = "ratios")]
    kind: StatementKind,

    #[command(flatten)]
    data: DataArgs,
}

impl DataArgs {
    fn apply(self, config: &mut AnalystConfig) {
        if let Some(period) = self.period {
            config.period = period;
        }
        if let Some(language) = self.language {
            config.language = language;
        }
        if let Some(labels) = self.labels {
            config.labels_path = Some(labels);
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format, "warn,agent_vnstock=info,agent_workflow=info");

    match cli.command {
        Command::Analyze(args) => analyze(args).await,
        Command::Normalize(args) => normalize(args).await,
        Command::Clean { output_dir } => clean(output_dir),
    }
}

async fn analyze(args: AnalyzeArgs) -> anyhow::Result<()> {
    let mut config = AnalystConfig::from_env()?;
    if let Some(analysis_type) = args.analysis_type {
        config.analysis_type = analysis_type;
    }
    if let Some(mode) = args.mode {
        config.execution_mode = mode;
    }
    if let Some(dir) = args.output_dir {
        config.output_dir = dir;
    }
    if let Some(model) = args.model {
        config.model = model;
    }
    if args.crew.is_some() {
        config.crew_path = args.crew;
    }
    if args.templates.is_some() {
        config.templates_dir = args.templates;
    }
    args.data.apply(&mut config);

    let pipeline = AnalysisPipeline::from_config(config)?;
    println!(
        "Analyzing {} ({} analysis, {} mode)...",
        args.symbol.to_uppercase(),
        pipeline.config().analysis_type,
        pipeline.config().execution_mode
    );

    match pipeline.run(&args.symbol).await {
        Ok(run) => {
            println!("Run {} complete:", run.run_id);
            for artifact in &run.artifacts {
                println!("  {:<18} {}", artifact.name(), artifact.path.display());
            }
            Ok(())
        }
        Err(failed) => {
            eprintln!("Analysis stopped during the {} stage.", failed.stage);
            Err(failed.source.into())
        }
    }
}

async fn normalize(args: NormalizeArgs) -> anyhow::Result<()> {
    let mut config = AnalystConfig::from_env()?;
    args.data.apply(&mut config);

    let normalizer = ColumnNormalizer::load(config.labels_path.as_deref())?;
    let source = MarketDataSource::from_config(&config, normalizer.clone())?;

    let raw = source
        .fetch(&args.symbol.to_uppercase(), args.kind)
        .await
        .with_context(|| format!("fetching {} for {}", args.kind, args.symbol))?;
    let statement = flatten(&raw, &normalizer)?;

    println!("## {} - {}\n", args.symbol.to_uppercase(), args.kind.title());
    println!("{}", markdown_table(&statement, None));
    Ok(())
}

fn clean(output_dir: Option<PathBuf>) -> anyhow::Result<()> {
    let dir = match output_dir {
        Some(dir) => dir,
        None => AnalystConfig::from_env()?.output_dir,
    };

    let removed = clean_reports(&dir)?;
    if removed.is_empty() {
        println!("Nothing to remove in {}", dir.display());
    }
    for path in removed {
        println!("Deleted: {}", path.display());
    }
    Ok(())
}
