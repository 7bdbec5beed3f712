//! Sampling daemon and live reading pipelines for the envmon home environment monitor.
//!
//! This crate samples a climate sensor and a particulate sensor at a fixed
//! interval, appends every sample to rotating plain-text log files and hands
//! the same samples to in-process consumers.
//!
//! # Features
//!
//! - **Sampling daemon**: One sample per interval, one log file per cycle
//! - **Rotating log files**: `<dir>/<YYYY-MM-DD HH-MM-SS>.txt`, header first
//! - **Hand-off buffer**: Unbounded FIFO for consumers that want every sample
//! - **Latest-reading cache**: Most recent parsed reading, never blocks readers
//! - **Lifecycle control**: Start and stop both background tasks together
//! - **Sensors**: Linux IIO climate sensors, PMS5003 over serial, simulation, mocks
//!
//! # Data Flow
//!
//! | Stage | Consumer | Delivery |
//! |-------|----------|----------|
//! | Log file | [archive reader](https://docs.rs/envmon-store) | Every sample, durable |
//! | [`HandoffBuffer`] | Bulk consumers such as charts | Every sample until the next rotation |
//! | [`LatestReadingCache`] | Dashboards | Most recent sample only |
//! | [`DaemonEvent`] | Logging and status displays | Lossy broadcast |
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use envmon_core::{EnvironmentSensor, IioClimateSensor, Monitor, MonitorConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let climate = IioClimateSensor::open(envmon_core::sensor::iio::DEFAULT_IIO_DEVICE)?;
//!     let sensor = Arc::new(EnvironmentSensor::new(climate, None));
//!
//!     let mut monitor = Monitor::new(MonitorConfig::default(), sensor)?;
//!     monitor.start()?;
//!
//!     tokio::signal::ctrl_c().await?;
//!     if let Some(latest) = monitor.get_latest() {
//!         println!("Last temperature: {:?}", latest.values.temperature);
//!     }
//!     monitor.stop().await?;
//!     Ok(())
//! }
//! ```

pub mod clock;
pub mod config;
pub mod daemon;
pub mod error;
pub mod events;
pub mod handoff;
pub mod latest;
pub mod mock;
pub mod monitor;
pub mod rotator;
pub mod sensor;

pub use clock::{Clock, SystemClock};
pub use config::{MonitorConfig, default_data_dir};
pub use daemon::{DaemonStats, SamplingDaemon};
pub use error::{Error, Result};
pub use events::{DaemonEvent, EventReceiver, EventSender, event_channel};
pub use handoff::HandoffBuffer;
pub use latest::{LatestReadingCache, LatestWorker};
pub use mock::{MockSensor, SteppingClock};
pub use monitor::{Monitor, StopReport};
pub use rotator::FileRotator;
pub use sensor::{
    EnvironmentSensor, IioClimateSensor, ParticleFrame, SensorSource, SerialParticleSensor,
    SimulatedSensor,
};

// Re-export the shared reading types
pub use envmon_types;
pub use envmon_types::{Field, Reading, SensorValues};
