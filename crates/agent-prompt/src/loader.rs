//! Directory-based template loader
//!
//! Files are named `{name}[_{lang}][.md].{j2|jinja}`:
//!
//! ```text
//! templates/
//! ├── report.md.j2        # English (no language suffix)
//! ├── report_vi.md.j2     # Vietnamese variant of "report"
//! └── news.md.jinja
//! ```

use crate::{JinjaTemplate, JinjaTemplateBuilder, Language, PromptError, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

const EXTENSIONS: [&str; 2] = [".j2", ".jinja"];

#[derive(Debug, Clone)]
pub struct FileLoader {
    base_path: PathBuf,
}

impl FileLoader {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Load every template file in the directory, grouping language variants
    pub fn load_all(&self) -> Result<Vec<JinjaTemplate>> {
        let entries = std::fs::read_dir(&self.base_path).map_err(|e| self.io_error(e))?;

        let mut grouped: BTreeMap<String, Vec<(Language, String)>> = BTreeMap::new();
        for entry in entries {
            let path = entry.map_err(|e| self.io_error(e))?.path();
            if !path.is_file() {
                continue;
            }
            let Some((name, lang)) = path
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(parse_filename)
            else {
                continue;
            };

            let content = std::fs::read_to_string(&path).map_err(|source| PromptError::Io {
                path: path.clone(),
                source,
            })?;
            debug!(template = %name, language = %lang, path = %path.display(), "Loaded template file");
            grouped.entry(name).or_default().push((lang, content));
        }

        grouped
            .into_iter()
            .map(|(name, variants)| {
                variants
                    .into_iter()
                    .fold(JinjaTemplateBuilder::new(name), |builder, (lang, body)| {
                        builder.template(lang, body)
                    })
                    .build()
            })
            .collect()
    }

    fn io_error(&self, source: std::io::Error) -> PromptError {
        PromptError::Io {
            path: self.base_path.clone(),
            source,
        }
    }
}

/// Split a file name into template name and language; `None` for other files
fn parse_filename(filename: &str) -> Option<(String, Language)> {
    let stem = EXTENSIONS
        .iter()
        .find_map(|ext| filename.strip_suffix(ext))?;
    let stem = stem.strip_suffix(".md").unwrap_or(stem);

    let variant = stem.rsplit_once('_').and_then(|(name, code)| {
        let language = Language::ALL.into_iter().find(|l| l.code() == code)?;
        (!name.is_empty()).then(|| (name.to_string(), language))
    });
    Some(variant.unwrap_or_else(|| (stem.to_string(), Language::English)))
}
