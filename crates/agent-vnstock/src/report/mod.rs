//! Markdown report artifacts

mod assembler;

pub use assembler::ReportAssembler;

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// The fixed set of documents a run produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Report,
    News,
    ExecutiveSummary,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 3] = [Self::Report, Self::News, Self::ExecutiveSummary];

    /// Template and base file name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Report => "report",
            Self::News => "news",
            Self::ExecutiveSummary => "executive_summary",
        }
    }

    pub fn file_name(&self) -> String {
        format!("{}.md", self.name())
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Generated text for each artifact, taken verbatim from the agents
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Narratives {
    pub analysis: String,
    pub news: String,
    pub executive_summary: String,
}

/// A document written by the assembler
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportArtifact {
    pub kind: ArtifactKind,
    pub path: PathBuf,
    pub content: String,
}

impl ReportArtifact {
    pub fn name(&self) -> &'static str {
        self.kind.name()
    }
}
