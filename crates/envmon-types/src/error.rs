//! Error types for parsing raw sample lines.

use thiserror::Error;

/// Errors that can occur when parsing a raw sample line or a field name.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ParseError {
    /// The line does not have one token per header column.
    #[error("Invalid field count: expected {expected} tokens, got {actual}")]
    FieldCount {
        /// Number of columns in the header.
        expected: usize,
        /// Number of tokens found on the line.
        actual: usize,
    },

    /// The timestamp token is not a finite number of seconds.
    #[error("Invalid timestamp: {0:?}")]
    InvalidTimestamp(String),

    /// The name does not match any sensor field.
    #[error("Unknown field: {0}")]
    UnknownField(String),
}

/// Result type alias using envmon-types' ParseError type.
pub type ParseResult<T> = std::result::Result<T, ParseError>;
