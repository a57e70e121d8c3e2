//! Tabular Export
//!
//! Turns procurement intervals into downloadable CSV documents.
//!
//! ## Row shapes
//!
//! - **Consolidated**: one flattened row per interval, with nested plant
//!   lists kept as JSON and summarized as gist strings
//! - **Raw**: the intervals exactly as received
//! - **Summary**: per-plant totals from the aggregator
//!
//! Every data cell is double-quoted with embedded quotes doubled, so the
//! output reads back losslessly with any RFC 4180 parser.

mod builder;
mod document;
mod profile;

pub use builder::{cell_text, ExportBuilder};
pub use document::{ExportDocument, StagedExport, CSV_CONTENT_TYPE};
pub use profile::{Column, ColumnSource, ExportProfile, GistFormat, HeaderMode, PlantGroup};

use thiserror::Error;

/// A flat export row; field order is preserved
pub type Row = serde_json::Map<String, serde_json::Value>;

/// Errors that can occur while building an export
#[derive(Error, Debug)]
pub enum ExportError {
    /// A header was requested for an empty row set
    #[error("No rows to export")]
    EmptyRowSet,

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type alias for export operations
pub type ExportResult<T> = Result<T, ExportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(ExportError::EmptyRowSet.to_string(), "No rows to export");
    }
}
