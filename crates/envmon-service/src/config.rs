//! Service configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use envmon_core::MonitorConfig;
use envmon_core::sensor::iio::DEFAULT_IIO_DEVICE;
use envmon_core::sensor::pms5003::DEFAULT_BAUD_RATE;

/// Service configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Sampling and log file settings.
    pub monitor: MonitorSection,
    /// Sensor hardware settings.
    pub sensors: SensorsSection,
}

impl Config {
    /// Load configuration from the default path.
    pub fn load_default() -> Result<Self, ConfigError> {
        let path = default_config_path();
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Read {
            path: path.as_ref().to_path_buf(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.as_ref().to_path_buf(),
            source: e,
        })
    }

    /// Save configuration to a file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self).map_err(ConfigError::Serialize)?;

        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        std::fs::write(path.as_ref(), content).map_err(|e| ConfigError::Write {
            path: path.as_ref().to_path_buf(),
            source: e,
        })
    }

    /// Validate the configuration and return every error found.
    ///
    /// # Example
    ///
    /// ```
    /// use envmon_service::Config;
    ///
    /// let config = Config::default();
    /// config.validate().expect("Default config should be valid");
    /// ```
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = self.monitor.validate();
        errors.extend(self.sensors.validate());

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    /// Load and validate configuration from a file.
    pub fn load_validated<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config = Self::load(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Runtime settings for the monitor.
    ///
    /// Call [`validate`](Self::validate) first; out-of-range durations fall
    /// back to their defaults here.
    pub fn monitor_config(&self) -> MonitorConfig {
        let defaults = MonitorConfig::new(&self.monitor.data_dir);
        let secs = |value: f64, default: Duration| {
            Duration::try_from_secs_f64(value).unwrap_or(default)
        };

        MonitorConfig {
            sampling_interval: secs(
                self.monitor.sampling_interval_secs,
                defaults.sampling_interval,
            ),
            samples_per_file: self.monitor.samples_per_file,
            shutdown_timeout: secs(self.monitor.shutdown_timeout_secs, defaults.shutdown_timeout),
            latest_poll: Duration::from_millis(self.monitor.latest_poll_ms),
            ..defaults
        }
    }
}

/// Longest accepted sampling interval (one day).
pub const MAX_SAMPLING_INTERVAL_SECS: f64 = 86_400.0;

/// Sampling and log file settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorSection {
    /// Directory holding the log files.
    pub data_dir: PathBuf,
    /// Pause after each sample, in seconds.
    pub sampling_interval_secs: f64,
    /// Samples per log file before rotating.
    pub samples_per_file: usize,
    /// Time allowed for background tasks to exit on shutdown, in seconds.
    pub shutdown_timeout_secs: f64,
    /// Upper bound on the latest-reading worker's sleep, in milliseconds.
    pub latest_poll_ms: u64,
}

impl Default for MonitorSection {
    fn default() -> Self {
        let defaults = MonitorConfig::default();
        Self {
            data_dir: defaults.data_dir,
            sampling_interval_secs: defaults.sampling_interval.as_secs_f64(),
            samples_per_file: defaults.samples_per_file,
            shutdown_timeout_secs: defaults.shutdown_timeout.as_secs_f64(),
            latest_poll_ms: defaults.latest_poll.as_millis() as u64,
        }
    }
}

impl MonitorSection {
    /// Validate monitor configuration.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.data_dir.as_os_str().is_empty() {
            errors.push(ValidationError::new(
                "monitor.data_dir",
                "data directory cannot be empty",
            ));
        }

        if !self.sampling_interval_secs.is_finite() || self.sampling_interval_secs < 0.0 {
            errors.push(ValidationError::new(
                "monitor.sampling_interval_secs",
                format!(
                    "sampling interval {} must be a non-negative number",
                    self.sampling_interval_secs
                ),
            ));
        } else if self.sampling_interval_secs > MAX_SAMPLING_INTERVAL_SECS {
            errors.push(ValidationError::new(
                "monitor.sampling_interval_secs",
                format!(
                    "sampling interval {} is too long (maximum {} seconds / 1 day)",
                    self.sampling_interval_secs, MAX_SAMPLING_INTERVAL_SECS
                ),
            ));
        }

        if self.samples_per_file == 0 {
            errors.push(ValidationError::new(
                "monitor.samples_per_file",
                "samples per file must be at least 1",
            ));
        }

        if !self.shutdown_timeout_secs.is_finite() || self.shutdown_timeout_secs <= 0.0 {
            errors.push(ValidationError::new(
                "monitor.shutdown_timeout_secs",
                format!(
                    "shutdown timeout {} must be greater than 0",
                    self.shutdown_timeout_secs
                ),
            ));
        }

        if self.latest_poll_ms == 0 {
            errors.push(ValidationError::new(
                "monitor.latest_poll_ms",
                "latest-reading poll must be greater than 0",
            ));
        }

        errors
    }
}

/// Where readings come from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensorMode {
    /// IIO climate sensor, plus the serial particle sensor if enabled.
    #[default]
    Hardware,
    /// Synthetic readings, no hardware needed.
    Simulated,
}

/// Sensor hardware settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorsSection {
    pub mode: SensorMode,
    /// IIO device directory of the climate sensor.
    pub iio_device: PathBuf,
    /// Serial port of the particle sensor.
    pub serial_port: String,
    pub baud_rate: u32,
    /// Read the particle sensor. When disabled, particulate fields are always missing.
    pub particles_enabled: bool,
}

impl Default for SensorsSection {
    fn default() -> Self {
        Self {
            mode: SensorMode::Hardware,
            iio_device: PathBuf::from(DEFAULT_IIO_DEVICE),
            serial_port: "/dev/serial0".to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
            particles_enabled: true,
        }
    }
}

impl SensorsSection {
    /// Validate sensor configuration. Device paths only matter in hardware mode.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        if self.mode == SensorMode::Simulated {
            return errors;
        }

        if self.iio_device.as_os_str().is_empty() {
            errors.push(ValidationError::new(
                "sensors.iio_device",
                "IIO device path cannot be empty",
            ));
        }

        if self.particles_enabled {
            if self.serial_port.is_empty() {
                errors.push(ValidationError::new(
                    "sensors.serial_port",
                    "serial port cannot be empty when particles are enabled",
                ));
            }
            if self.baud_rate == 0 {
                errors.push(ValidationError::new(
                    "sensors.baud_rate",
                    "baud rate must be greater than 0",
                ));
            }
        }

        errors
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Failed to serialize config: {0}")]
    Serialize(toml::ser::Error),
    #[error("Failed to write config file {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Configuration validation failed:\n{}", format_validation_errors(.0))]
    Validation(Vec<ValidationError>),
}

/// A single validation error with context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// The field path (e.g., `monitor.samples_per_file`).
    pub field: String,
    /// Description of the validation failure.
    pub message: String,
}

impl ValidationError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn format_validation_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| format!("  - {}", e))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Default configuration file path.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("envmon")
        .join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.monitor.sampling_interval_secs, 5.0);
        assert_eq!(config.monitor.samples_per_file, 720);
        assert_eq!(config.sensors.mode, SensorMode::Hardware);
        assert_eq!(config.monitor.data_dir, envmon_core::default_data_dir());
    }

    #[test]
    fn test_default_config_validates() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let toml = r#"
            [monitor]
            data_dir = "/var/lib/envmon"
            sampling_interval_secs = 2.5

            [sensors]
            mode = "simulated"
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.monitor.data_dir, PathBuf::from("/var/lib/envmon"));
        assert_eq!(config.monitor.samples_per_file, 720);
        assert_eq!(config.sensors.mode, SensorMode::Simulated);
        assert_eq!(config.sensors.baud_rate, 9600);

        let monitor = config.monitor_config();
        assert_eq!(monitor.sampling_interval, Duration::from_millis(2500));
        assert_eq!(monitor.latest_poll, Duration::from_secs(1));
        assert!(monitor.validate().is_ok());
    }

    #[test]
    fn test_config_save_and_load() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config_path = temp_dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.monitor.data_dir = PathBuf::from("/tmp/envmon");
        config.monitor.samples_per_file = 60;
        config.sensors.particles_enabled = false;
        config.save(&config_path).unwrap();

        let loaded = Config::load(&config_path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_config_load_nonexistent() {
        let result = Config::load("/nonexistent/path/config.toml");
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }

    #[test]
    fn test_config_load_invalid_toml() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config_path = temp_dir.path().join("invalid.toml");
        std::fs::write(&config_path, "this is not valid { toml").unwrap();

        let result = Config::load(&config_path);
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_unknown_sensor_mode_is_parse_error() {
        let result: Result<Config, _> = toml::from_str("[sensors]\nmode = \"bluetooth\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_validation_collects_all_errors() {
        let mut config = Config::default();
        config.monitor.sampling_interval_secs = -1.0;
        config.monitor.samples_per_file = 0;
        config.monitor.latest_poll_ms = 0;
        config.sensors.serial_port = String::new();

        let Err(ConfigError::Validation(errors)) = config.validate() else {
            panic!("expected validation errors");
        };
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(
            fields,
            [
                "monitor.sampling_interval_secs",
                "monitor.samples_per_file",
                "monitor.latest_poll_ms",
                "sensors.serial_port",
            ]
        );

        let display = ConfigError::Validation(errors).to_string();
        assert!(display.contains("  - monitor.samples_per_file: samples per file must be at least 1"));
    }

    #[test]
    fn test_too_long_interval() {
        let mut config = Config::default();
        config.monitor.sampling_interval_secs = MAX_SAMPLING_INTERVAL_SECS + 1.0;
        assert!(config.validate().is_err());

        config.monitor.sampling_interval_secs = 0.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_simulated_mode_ignores_device_paths() {
        let mut config = Config::default();
        config.sensors.mode = SensorMode::Simulated;
        config.sensors.iio_device = PathBuf::new();
        config.sensors.serial_port = String::new();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_config_path() {
        let path = default_config_path();
        assert!(path.ends_with("envmon/config.toml"));
    }
}
