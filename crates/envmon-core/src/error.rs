//! Error types for envmon-core.
//!
//! # Error Propagation
//!
//! Errors fall into two groups depending on what they put at risk.
//!
//! | Error | Affects | Handling |
//! |-------|---------|----------|
//! | [`Error::SensorRead`], [`Error::InvalidFrame`], [`Error::Serial`] during sampling | one sample | Absorbed by the daemon: the sample is recorded with missing values |
//! | [`Error::DeviceNotFound`] | startup | Returned from sensor construction; the daemon is never started |
//! | [`Error::CreateLog`], [`Error::AppendLog`], [`Error::NoActiveLog`] | persistence | Ends the daemon; surfaced by [`Monitor::stop`](crate::Monitor::stop) |
//! | [`Error::InvalidConfig`] | startup | Returned from [`Monitor::new`](crate::Monitor::new) |
//!
//! Parse failures in the latest-reading worker never become an `Error`; the
//! previous snapshot is kept.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while sampling and persisting readings.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// A sensor device is not present.
    #[error("Sensor device not found: {0}")]
    DeviceNotFound(String),

    /// A single sensor read failed.
    #[error("Sensor read failed: {0}")]
    SensorRead(String),

    /// A particulate sensor frame was malformed.
    #[error("Invalid particle sensor frame: {0}")]
    InvalidFrame(String),

    /// Serial port error.
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// A fresh log file could not be created.
    #[error("Failed to create log file {path}: {source}")]
    CreateLog {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A sample could not be appended to the active log file.
    #[error("Failed to append to log file {path}: {source}")]
    AppendLog {
        path: PathBuf,
        source: std::io::Error,
    },

    /// An append was attempted before any log file was opened.
    #[error("No active log file")]
    NoActiveLog,

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A background task panicked or could not be spawned.
    #[error("Task failed: {0}")]
    TaskFailed(String),

    /// A raw sample line could not be parsed.
    #[error(transparent)]
    Parse(#[from] envmon_types::ParseError),

    /// I/O error.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }

    /// Create a sensor read error.
    pub fn sensor_read(message: impl Into<String>) -> Self {
        Self::SensorRead(message.into())
    }

    /// Whether this error means data can no longer be persisted.
    pub fn is_persistence_failure(&self) -> bool {
        matches!(
            self,
            Error::CreateLog { .. } | Error::AppendLog { .. } | Error::NoActiveLog
        )
    }
}

/// Result type alias using envmon-core's Error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::DeviceNotFound("/dev/ttyS0".to_string());
        assert_eq!(err.to_string(), "Sensor device not found: /dev/ttyS0");

        let err = Error::CreateLog {
            path: PathBuf::from("/data/2024-01-01 00-00-00.txt"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(err.to_string().contains("2024-01-01 00-00-00.txt"));
        assert!(err.to_string().contains("denied"));
    }

    #[test]
    fn test_persistence_classification() {
        let append = Error::AppendLog {
            path: PathBuf::from("x.txt"),
            source: std::io::Error::other("disk full"),
        };
        assert!(append.is_persistence_failure());
        assert!(Error::NoActiveLog.is_persistence_failure());
        assert!(!Error::sensor_read("checksum").is_persistence_failure());
    }

    #[test]
    fn test_parse_error_conversion() {
        let err: Error = envmon_types::ParseError::InvalidTimestamp("x".into()).into();
        assert!(matches!(err, Error::Parse(_)));
    }
}
