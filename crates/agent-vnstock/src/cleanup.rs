//! Removal of generated reports and leftovers

use crate::error::{AnalystError, Result};
use crate::report::ArtifactKind;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Leftover from an interrupted run: a lock file or a temp file, either
/// `*.tmp` or an unrenamed `.tmp*` from the atomic report writer
fn is_leftover(file_name: &str) -> bool {
    file_name.ends_with(".lock") || file_name.ends_with(".tmp") || file_name.starts_with(".tmp")
}

/// Delete the report files and leftovers in `dir`; returns what was removed
///
/// Missing reports are skipped. Subdirectories are never touched.
pub fn clean_reports(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut removed = Vec::new();

    for kind in ArtifactKind::ALL {
        let path = dir.join(kind.file_name());
        match fs::remove_file(&path) {
            Ok(()) => removed.push(path),
            Err(e) if e.kind() == ErrorKind::NotFound => debug!(path = %path.display(), "Not found"),
            Err(source) => return Err(AnalystError::WriteFailed { path, source }),
        }
    }

    let entries = fs::read_dir(dir).map_err(|source| AnalystError::WriteFailed {
        path: dir.to_path_buf(),
        source,
    })?;
    for entry in entries.flatten() {
        let path = entry.path();
        let leftover = entry.file_name().to_str().is_some_and(is_leftover);
        if !leftover || !path.is_file() {
            continue;
        }
        fs::remove_file(&path).map_err(|source| AnalystError::WriteFailed {
            path: path.clone(),
            source,
        })?;
        removed.push(path);
    }

    info!(dir = %dir.display(), removed = removed.len(), "Cleaned output directory");
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_is_leftover() {
        assert!(is_leftover("chromadb-1234.lock"));
        assert!(is_leftover(".tmpA1b2C3"));
        assert!(is_leftover("report.md.tmp"));
        assert!(!is_leftover("notes.md"));
        assert!(!is_leftover("data.tmp.md"));
    }

    #[test]
    fn test_clean_reports() {
        let dir = tempdir().unwrap();
        for name in ["report.md", "news.md", "run.lock", ".tmpXYZ", "partial.tmp", "notes.md"] {
            fs::write(dir.path().join(name), "x").unwrap();
        }
        fs::create_dir(dir.path().join(".tmpdir")).unwrap();

        let removed = clean_reports(dir.path()).unwrap();
        let mut names: Vec<String> = removed
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(
            names,
            vec![".tmpXYZ", "news.md", "partial.tmp", "report.md", "run.lock"]
        );

        assert!(dir.path().join("notes.md").exists());
        assert!(dir.path().join(".tmpdir").is_dir());
    }

    #[test]
    fn test_clean_empty_dir() {
        let dir = tempdir().unwrap();
        assert!(clean_reports(dir.path()).unwrap().is_empty());
    }
}
