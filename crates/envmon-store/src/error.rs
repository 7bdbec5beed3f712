//! Error types for envmon-store.

use std::path::PathBuf;

/// Result type for envmon-store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while reading the archive.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The archive directory does not exist.
    #[error("Archive directory not found: {0}")]
    DirectoryNotFound(PathBuf),

    /// No log file matched the selection.
    #[error("No log files match the selection")]
    NoFiles,

    /// A log file does not start with the expected header.
    #[error("Unexpected header in {path}")]
    HeaderMismatch { path: PathBuf },

    /// A row in the middle of a log file has the wrong number of columns.
    #[error("Malformed row at {path}:{line}: expected {expected} columns, found {actual}")]
    MalformedRow {
        path: PathBuf,
        line: usize,
        expected: usize,
        actual: usize,
    },

    /// Unknown time window name.
    #[error("Invalid time window: {0} (expected one of 1h, 8h, 24h, 7d, 1m, 6m, 1y)")]
    InvalidWindow(String),

    /// An argument was out of range.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A line could not be parsed as a reading.
    #[error(transparent)]
    Parse(#[from] envmon_types::ParseError),

    /// CSV error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
