//! Renders and writes the report artifacts

use super::{ArtifactKind, Narratives, ReportArtifact};
use crate::config::{AnalysisType, AnalystConfig};
use crate::context::AnalysisContext;
use crate::error::{AnalystError, Result};
use crate::statement::{NO_DATA, StatementKind, markdown_table, snapshot_table};
use agent_prompt::{FileLoader, JinjaTemplate, PromptRegistry, PromptTemplate};
use chrono::Local;
use serde_json::json;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const BUILTIN_TEMPLATES: [(ArtifactKind, &str); 3] = [
    (ArtifactKind::Report, include_str!("../../data/templates/report.md.j2")),
    (ArtifactKind::News, include_str!("../../data/templates/news.md.j2")),
    (
        ArtifactKind::ExecutiveSummary,
        include_str!("../../data/templates/executive_summary.md.j2"),
    ),
];

/// Turns an [`AnalysisContext`] and agent narratives into markdown files
///
/// Each file is written to a temporary file in the output directory and then
/// renamed over `<name>.md`, so readers never see a half-written report and
/// nothing temporary is left behind.
#[derive(Debug)]
pub struct ReportAssembler {
    output_dir: PathBuf,
    templates: PromptRegistry,
}

impl ReportAssembler {
    pub fn new(output_dir: impl Into<PathBuf>) -> Result<Self> {
        let templates = PromptRegistry::new();
        for (kind, body) in BUILTIN_TEMPLATES {
            templates.register(JinjaTemplate::new(kind.name(), body)?);
        }

        Ok(Self {
            output_dir: output_dir.into(),
            templates,
        })
    }

    pub fn from_config(config: &AnalystConfig) -> Result<Self> {
        let assembler = Self::new(&config.output_dir)?;
        match &config.templates_dir {
            Some(dir) => assembler.with_overrides(dir),
            None => Ok(assembler),
        }
    }

    /// Replace built-in templates with the `<name>.md.j2` files in `dir`
    pub fn with_overrides(self, dir: &Path) -> Result<Self> {
        for template in FileLoader::new(dir).load_all()? {
            debug!(template = template.name(), dir = %dir.display(), "Template override");
            self.templates.register(template);
        }
        Ok(self)
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Content of every artifact, in [`ArtifactKind::ALL`] order
    pub fn render(
        &self,
        context: &AnalysisContext,
        narratives: &Narratives,
        analysis_type: AnalysisType,
        generated: &str,
    ) -> Result<Vec<(ArtifactKind, String)>> {
        let company = context.company();

        let appendix: Vec<_> = context
            .statements()
            .map(|statement| {
                json!({
                    "title": statement.kind().title(),
                    "table": markdown_table(statement, None),
                })
            })
            .collect();

        let sources: Vec<_> = context
            .intelligence()
            .results
            .iter()
            .map(|r| json!({ "title": r.title, "url": r.url }))
            .collect();

        let vars = [
            (
                ArtifactKind::Report,
                json!({
                    "symbol": context.symbol(),
                    "company_name": company.name,
                    "industry": company.industry,
                    "analysis_type": analysis_type.title(),
                    "generated": generated,
                    "narrative": narratives.analysis,
                    "appendix": appendix,
                }),
            ),
            (
                ArtifactKind::News,
                json!({
                    "symbol": context.symbol(),
                    "generated": generated,
                    "narrative": narratives.news,
                    "sources": sources,
                }),
            ),
            (
                ArtifactKind::ExecutiveSummary,
                json!({
                    "symbol": context.symbol(),
                    "company_name": company.name,
                    "generated": generated,
                    "narrative": narratives.executive_summary,
                    "snapshot": context
                        .statement(StatementKind::Ratios)
                        .map_or_else(|| NO_DATA.to_string(), snapshot_table),
                }),
            ),
        ];

        vars.into_iter()
            .map(|(kind, vars)| Ok((kind, self.templates.render(kind.name(), &vars)?)))
            .collect()
    }

    /// Render everything, then write the files one by one
    ///
    /// Rendering failures write nothing. A write failure stops at that file
    /// and leaves the files already written in place.
    pub fn assemble(
        &self,
        context: &AnalysisContext,
        narratives: &Narratives,
        analysis_type: AnalysisType,
    ) -> Result<Vec<ReportArtifact>> {
        let generated = Local::now().format(TIMESTAMP_FORMAT).to_string();
        let rendered = self.render(context, narratives, analysis_type, &generated)?;

        std::fs::create_dir_all(&self.output_dir).map_err(|source| AnalystError::WriteFailed {
            path: self.output_dir.clone(),
            source,
        })?;

        let mut artifacts = Vec::with_capacity(rendered.len());
        for (kind, content) in rendered {
            let path = self.output_dir.join(kind.file_name());
            write_atomically(&self.output_dir, &path, &content)?;
            info!(artifact = %kind, path = %path.display(), bytes = content.len(), "Artifact written");
            artifacts.push(ReportArtifact {
                kind,
                path,
                content,
            });
        }

        Ok(artifacts)
    }
}

/// Write through a temp file in `dir` renamed over `path`
fn write_atomically(dir: &Path, path: &Path, content: &str) -> Result<()> {
    let failed = |source: std::io::Error| AnalystError::WriteFailed {
        path: path.to_path_buf(),
        source,
    };

    let mut file = NamedTempFile::new_in(dir).map_err(failed)?;
    file.write_all(content.as_bytes()).map_err(failed)?;
    file.as_file().sync_all().map_err(failed)?;
    file.persist(path).map_err(|e| failed(e.error))?;
    Ok(())
}
