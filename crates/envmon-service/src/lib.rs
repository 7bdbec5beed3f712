//! The envmon service: runs the sampling daemon and queries the archive.
//!
//! # Configuration
//!
//! The service reads configuration from `~/.config/envmon/config.toml`:
//!
//! ```toml
//! [monitor]
//! data_dir = "/home/pi/envmon/data"
//! sampling_interval_secs = 5.0
//! samples_per_file = 720
//! shutdown_timeout_secs = 2.0
//! latest_poll_ms = 1000
//!
//! [sensors]
//! mode = "hardware"        # or "simulated"
//! iio_device = "/sys/bus/iio/devices/iio:device0"
//! serial_port = "/dev/serial0"
//! baud_rate = 9600
//! particles_enabled = true
//! ```
//!
//! Every key is optional; missing keys take the defaults shown.

pub mod config;
pub mod report;

use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use tracing::{info, warn};

use envmon_core::{
    EnvironmentSensor, IioClimateSensor, SensorSource, SerialParticleSensor, SimulatedSensor,
};

pub use config::{
    Config, ConfigError, MonitorSection, SensorMode, SensorsSection, ValidationError,
    default_config_path,
};

/// Open the sensors described by `config`.
///
/// # Errors
///
/// Returns [`envmon_core::Error::DeviceNotFound`] if the climate sensor or an
/// enabled particle sensor is not present.
pub fn build_sensor(config: &SensorsSection) -> envmon_core::Result<Arc<dyn SensorSource>> {
    match config.mode {
        SensorMode::Simulated => {
            info!("Using simulated sensors");
            Ok(Arc::new(SimulatedSensor::new()))
        }
        SensorMode::Hardware => {
            let climate = IioClimateSensor::open(&config.iio_device)?;
            info!(
                "Climate sensor {} at {}",
                climate.name(),
                config.iio_device.display()
            );

            let particles = if config.particles_enabled {
                let sensor = SerialParticleSensor::open(&config.serial_port, config.baud_rate)?;
                info!("Particle sensor at {}", config.serial_port);
                Some(sensor)
            } else {
                warn!("Particle sensor disabled, particulate fields will be missing");
                None
            };

            Ok(Arc::new(EnvironmentSensor::new(climate, particles)))
        }
    }
}

/// Parse a local time given as `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DDTHH:MM:SS`,
/// `YYYY-MM-DD HH:MM` or `YYYY-MM-DD` (midnight).
pub fn parse_local_time(s: &str) -> Result<NaiveDateTime, String> {
    let s = s.trim();
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(time) = NaiveDateTime::parse_from_str(s, format) {
            return Ok(time);
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .ok_or_else(|| format!("invalid time '{s}': expected YYYY-MM-DD[ HH:MM[:SS]]"))
}
