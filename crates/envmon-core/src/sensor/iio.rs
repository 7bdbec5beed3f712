//! Climate readings from a Linux Industrial I/O device.
//!
//! The kernel `bmp280` driver exposes a BME280 under
//! `/sys/bus/iio/devices/iio:deviceN/` with processed channels:
//!
//! | File | Unit | Field |
//! |------|------|-------|
//! | `in_temp_input` | milli °C | temperature |
//! | `in_humidityrelative_input` | milli %RH | humidity (BME280 only) |
//! | `in_pressure_input` | kPa | pressure, converted to hPa |

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use envmon_types::{Field, SensorValues};

use crate::error::{Error, Result};
use crate::sensor::SensorSource;

/// Default IIO device directory.
pub const DEFAULT_IIO_DEVICE: &str = "/sys/bus/iio/devices/iio:device0";

const TEMPERATURE_CHANNEL: &str = "in_temp_input";
const HUMIDITY_CHANNEL: &str = "in_humidityrelative_input";
const PRESSURE_CHANNEL: &str = "in_pressure_input";

/// Temperature, humidity and pressure from an IIO sysfs directory.
#[derive(Debug, Clone)]
pub struct IioClimateSensor {
    dir: PathBuf,
    name: String,
}

impl IioClimateSensor {
    /// Open the device at `dir`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DeviceNotFound`] if the directory has no temperature channel.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        if !dir.join(TEMPERATURE_CHANNEL).is_file() {
            return Err(Error::DeviceNotFound(dir.display().to_string()));
        }

        let name = std::fs::read_to_string(dir.join("name"))
            .map(|n| n.trim().to_string())
            .unwrap_or_else(|_| "iio".to_string());

        Ok(Self { dir, name })
    }

    /// Name reported by the driver.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Device directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    async fn read_channel(&self, channel: &str) -> Result<Option<f64>> {
        let path = self.dir.join(channel);
        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Error::sensor_read(format!("{}: {e}", path.display()))),
        };
        raw.trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|_| Error::sensor_read(format!("{}: invalid value {raw:?}", path.display())))
    }
}

#[async_trait]
impl SensorSource for IioClimateSensor {
    fn name(&self) -> &str {
        &self.name
    }

    async fn read(&self) -> Result<SensorValues> {
        let temperature = self
            .read_channel(TEMPERATURE_CHANNEL)
            .await?
            .ok_or_else(|| Error::sensor_read("temperature channel disappeared"))?;
        let humidity = self.read_channel(HUMIDITY_CHANNEL).await?;
        let pressure = self.read_channel(PRESSURE_CHANNEL).await?;

        let mut values = SensorValues::missing();
        values.set(Field::Temperature, Some(temperature / 1000.0));
        values.set(Field::Humidity, humidity.map(|h| h / 1000.0));
        values.set(Field::Pressure, pressure.map(|kpa| kpa * 10.0));
        Ok(values)
    }
}
