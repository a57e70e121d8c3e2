//! Export documents
//!
//! An [`ExportDocument`] is the finished CSV text. Staging it writes a
//! file that lives until the returned [`StagedExport`] is dropped, so a
//! download that is no longer shown does not leave files behind.

use chrono::Utc;
use std::path::{Path, PathBuf};

use super::ExportResult;

pub const CSV_CONTENT_TYPE: &str = "text/csv; charset=utf-8";

/// CSV text ready to be offered as a download
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportDocument {
    filename: String,
    content: String,
}

impl ExportDocument {
    /// Wrap CSV text under a timestamped filename
    pub fn new(content: String) -> Self {
        Self {
            filename: timestamped_filename("procurement_export"),
            content,
        }
    }

    /// Builder method: timestamped filename with the given stem
    pub fn named(mut self, stem: &str) -> Self {
        self.filename = timestamped_filename(stem);
        self
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn content_type(&self) -> &'static str {
        CSV_CONTENT_TYPE
    }

    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// Write the document to `path`, keeping it
    pub fn save(&self, path: &Path) -> ExportResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, &self.content)?;
        tracing::info!(path = ?path, bytes = self.len(), "Export saved");
        Ok(())
    }

    /// Write the document into `dir` as a revocable download
    pub fn stage(&self, dir: &Path) -> ExportResult<StagedExport> {
        let path = dir.join(&self.filename);
        std::fs::create_dir_all(dir)?;
        std::fs::write(&path, &self.content)?;
        tracing::debug!(path = ?path, "Export staged");

        Ok(StagedExport { path, kept: false })
    }
}

/// A staged export file, removed on drop unless kept
#[derive(Debug)]
pub struct StagedExport {
    path: PathBuf,
    kept: bool,
}

impl StagedExport {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stop managing the file and return its path
    pub fn keep(mut self) -> PathBuf {
        self.kept = true;
        std::mem::take(&mut self.path)
    }

    /// Remove the file now
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for StagedExport {
    fn drop(&mut self) {
        if self.kept {
            return;
        }
        if let Err(e) = std::fs::remove_file(&self.path) {
            tracing::debug!(path = ?self.path, error = %e, "Staged export already gone");
        }
    }
}

fn timestamped_filename(stem: &str) -> String {
    format!("{}_{}.csv", stem, Utc::now().format("%Y%m%d_%H%M%S"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filename() {
        let doc = ExportDocument::new("a\n".to_string()).named("raw");
        assert!(doc.filename().starts_with("raw_"));
        assert!(doc.filename().ends_with(".csv"));
        assert_eq!(doc.content_type(), CSV_CONTENT_TYPE);
    }

    #[test]
    fn test_staged_export_is_released_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let doc = ExportDocument::new("a,b\n\"1\",\"2\"\n".to_string());

        let staged = doc.stage(dir.path()).unwrap();
        let path = staged.path().to_path_buf();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), doc.content());

        staged.release();
        assert!(!path.exists());
    }

    #[test]
    fn test_kept_export_survives() {
        let dir = tempfile::tempdir().unwrap();
        let doc = ExportDocument::new("a\n".to_string());

        let path = doc.stage(dir.path()).unwrap().keep();
        assert!(path.exists());
    }

    #[test]
    fn test_save_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("export.csv");

        ExportDocument::new("x\n".to_string()).save(&path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "x\n");
    }
}
