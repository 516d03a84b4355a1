//! Typed failures for the row reader and for the fatal business rules of a batch.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while opening or decoding a tab-delimited source file.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The source file does not exist. Callers treat this as "no data" for optional families.
    #[error("source file not found: {path}")]
    NotFound { path: PathBuf },

    /// The tabular parser rejected the file.
    #[error("malformed source file {path}: {source}")]
    Format {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// A data row does not have as many columns as the header declares.
    #[error("{path}:{line}: expected {expected} columns, found {found}")]
    ColumnCount { path: PathBuf, line: u64, expected: usize, found: usize },

    /// No literal header row and no fallback header list for this family.
    #[error("no header row in {path} and no fallback headers for this family")]
    MissingHeader { path: PathBuf },

    /// A column the record type needs is absent from the resolved header.
    #[error("required column '{column}' not found in {path}")]
    MissingColumn { path: PathBuf, column: &'static str },

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl SourceError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, SourceError::NotFound { .. })
    }
}

/// Errors that abort the whole batch before any output is written.
#[derive(Debug, Error)]
pub enum EtlError {
    #[error("no output base directory configured")]
    MissingOutputDir,

    #[error("student {student_id}: cannot parse entry date '{raw}' to resolve the enrollment year")]
    UnparsableEntryDate { student_id: String, raw: String },

    #[error("student {student_id}: special education program row has no primary disability code")]
    DisabilityCodeMissing { student_id: String },
}
