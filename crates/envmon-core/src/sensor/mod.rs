//! Sample readers.
//!
//! The daemon only depends on the [`SensorSource`] capability, so hardware
//! sessions are constructed outside of it and injected. Implementations:
//!
//! - [`IioClimateSensor`]: temperature, humidity and pressure from a Linux IIO
//!   device such as the kernel BME280 driver
//! - [`SerialParticleSensor`]: particulate fields from a PMS5003 on a serial port
//! - [`EnvironmentSensor`]: both of the above combined
//! - [`SimulatedSensor`]: synthetic indoor readings for running without hardware
//! - [`MockSensor`](crate::mock::MockSensor): scripted results for tests

pub mod iio;
pub mod pms5003;
pub mod simulated;

use async_trait::async_trait;
use tracing::warn;

use envmon_types::SensorValues;

use crate::error::Result;

pub use iio::IioClimateSensor;
pub use pms5003::{ParticleFrame, SerialParticleSensor};
pub use simulated::SimulatedSensor;

/// A source of sensor values, queried once per sample.
///
/// # Example
///
/// ```
/// use envmon_core::{MockSensor, SensorSource};
///
/// # #[tokio::main]
/// # async fn main() {
/// let sensor = MockSensor::new("bench");
/// let values = sensor.read().await.unwrap();
/// assert!(values.temperature.is_some());
/// # }
/// ```
#[async_trait]
pub trait SensorSource: Send + Sync {
    /// Human readable name used in logs.
    fn name(&self) -> &str;

    /// Query the sensors once.
    ///
    /// Returning an error means no field could be read; the daemon then
    /// records a reading with every field missing. Implementations that can
    /// read some channels but not others should return `Ok` with the
    /// unreadable fields left as `None`.
    async fn read(&self) -> Result<SensorValues>;
}

/// The climate sensor and the optional particulate sensor read together.
///
/// A climate failure fails the whole read. A particulate failure only leaves
/// the particulate fields missing.
#[derive(Debug)]
pub struct EnvironmentSensor {
    name: String,
    climate: IioClimateSensor,
    particles: Option<SerialParticleSensor>,
}

impl EnvironmentSensor {
    /// Combine a climate sensor with an optional particulate sensor.
    pub fn new(climate: IioClimateSensor, particles: Option<SerialParticleSensor>) -> Self {
        let name = match &particles {
            Some(p) => format!("{} + {}", climate.name(), p.name()),
            None => climate.name().to_string(),
        };
        Self {
            name,
            climate,
            particles,
        }
    }
}

#[async_trait]
impl SensorSource for EnvironmentSensor {
    fn name(&self) -> &str {
        &self.name
    }

    async fn read(&self) -> Result<SensorValues> {
        let mut values = self.climate.read().await?;

        if let Some(particles) = &self.particles {
            match particles.read_frame().await {
                Ok(frame) => frame.apply_to(&mut values),
                Err(e) => {
                    warn!(sensor = particles.name(), error = %e, "Particle read failed");
                    values.clear_particulates();
                }
            }
        }

        Ok(values)
    }
}
