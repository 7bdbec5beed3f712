//! Runtime settings for the sampling daemon and its pipelines.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default pause between samples.
pub const DEFAULT_SAMPLING_INTERVAL: Duration = Duration::from_secs(5);

/// Default samples per log file: one hour at the default interval.
pub const DEFAULT_SAMPLES_PER_FILE: usize = 720;

/// Default time allowed for the latest-reading worker to exit on stop.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(2);

/// Default upper bound on how long the latest-reading worker sleeps between
/// cancellation checks.
pub const DEFAULT_LATEST_POLL: Duration = Duration::from_secs(1);

/// Default daemon event channel capacity.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Settings for a [`Monitor`](crate::Monitor).
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use envmon_core::MonitorConfig;
///
/// let config = MonitorConfig::new("/tmp/envmon")
///     .with_sampling_interval(Duration::from_secs(10))
///     .with_samples_per_file(360);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Directory holding the log files.
    pub data_dir: PathBuf,
    /// Pause after each sample. Zero means sample back to back.
    #[serde(with = "duration_secs")]
    pub sampling_interval: Duration,
    /// Samples written to each log file before rotating.
    pub samples_per_file: usize,
    /// How long [`Monitor::stop`](crate::Monitor::stop) waits for the
    /// latest-reading worker.
    #[serde(with = "duration_secs")]
    pub shutdown_timeout: Duration,
    /// Latest-reading worker poll bound.
    #[serde(with = "duration_secs")]
    pub latest_poll: Duration,
    /// Daemon event channel capacity.
    pub event_capacity: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self::new(default_data_dir())
    }
}

impl MonitorConfig {
    /// Default settings writing into `data_dir`.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            sampling_interval: DEFAULT_SAMPLING_INTERVAL,
            samples_per_file: DEFAULT_SAMPLES_PER_FILE,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            latest_poll: DEFAULT_LATEST_POLL,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }

    /// Set the pause between samples.
    #[must_use]
    pub fn with_sampling_interval(mut self, interval: Duration) -> Self {
        self.sampling_interval = interval;
        self
    }

    /// Set the number of samples per log file.
    #[must_use]
    pub fn with_samples_per_file(mut self, samples: usize) -> Self {
        self.samples_per_file = samples;
        self
    }

    /// Set the worker shutdown timeout.
    #[must_use]
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Set the latest-reading worker poll bound.
    #[must_use]
    pub fn with_latest_poll(mut self, poll: Duration) -> Self {
        self.latest_poll = poll;
        self
    }

    /// Data directory.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Check the settings.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] describing the first invalid value.
    pub fn validate(&self) -> Result<()> {
        if self.data_dir.as_os_str().is_empty() {
            return Err(Error::invalid_config("data directory cannot be empty"));
        }
        if self.samples_per_file == 0 {
            return Err(Error::invalid_config("samples per file must be at least 1"));
        }
        if self.latest_poll.is_zero() {
            return Err(Error::invalid_config("latest-reading poll must be greater than 0"));
        }
        if self.event_capacity == 0 {
            return Err(Error::invalid_config("event capacity must be at least 1"));
        }
        Ok(())
    }
}

/// Default data directory.
///
/// - Linux: `~/.local/share/envmon/data`
/// - macOS: `~/Library/Application Support/envmon/data`
/// - Windows: `C:\Users\<user>\AppData\Local\envmon\data`
pub fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("envmon")
        .join("data")
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = MonitorConfig::new("/data");
        assert_eq!(config.sampling_interval, Duration::from_secs(5));
        assert_eq!(config.samples_per_file, 720);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_interval_is_valid() {
        let config = MonitorConfig::new("/data").with_sampling_interval(Duration::ZERO);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_failures() {
        let err = MonitorConfig::new("/data")
            .with_samples_per_file(0)
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("samples per file"));

        assert!(MonitorConfig::new("").validate().is_err());
        assert!(
            MonitorConfig::new("/data")
                .with_latest_poll(Duration::ZERO)
                .validate()
                .is_err()
        );
    }

    #[test]
    fn test_default_data_dir_is_namespaced() {
        let dir = default_data_dir();
        assert!(dir.ends_with("envmon/data"));
    }

    #[test]
    fn test_serde_durations_as_seconds() {
        let config = MonitorConfig::new("/data").with_sampling_interval(Duration::from_millis(2500));
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["sampling_interval"], 2.5);

        let back: MonitorConfig = serde_json::from_value(json).unwrap();
        assert_eq!(back, config);
    }
}
