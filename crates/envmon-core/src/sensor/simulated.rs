//! Synthetic readings for running the monitor without hardware.

use std::sync::Mutex;

use async_trait::async_trait;
use rand::Rng;

use envmon_types::{Field, SensorValues};

use crate::error::Result;
use crate::sensor::SensorSource;

#[derive(Debug, Clone, Copy)]
struct WalkState {
    temperature: f64,
    humidity: f64,
    pressure: f64,
    pm25: f64,
}

/// A sensor producing a plausible indoor random walk.
///
/// Every field is always present. Particle counts are cumulative across size
/// bins, as a PMS5003 reports them.
#[derive(Debug)]
pub struct SimulatedSensor {
    name: String,
    state: Mutex<WalkState>,
}

impl Default for SimulatedSensor {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedSensor {
    /// Start the walk at typical indoor conditions.
    pub fn new() -> Self {
        Self {
            name: "simulated".to_string(),
            state: Mutex::new(WalkState {
                temperature: 21.0,
                humidity: 45.0,
                pressure: 1013.0,
                pm25: 6.0,
            }),
        }
    }

    fn step(&self) -> WalkState {
        let mut rng = rand::rng();
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.temperature = (state.temperature + rng.random_range(-0.1..=0.1)).clamp(15.0, 30.0);
        state.humidity = (state.humidity + rng.random_range(-0.5..=0.5)).clamp(20.0, 80.0);
        state.pressure = (state.pressure + rng.random_range(-0.2..=0.2)).clamp(970.0, 1050.0);
        state.pm25 = (state.pm25 + rng.random_range(-0.8..=0.8)).clamp(0.0, 80.0);
        *state
    }
}

#[async_trait]
impl SensorSource for SimulatedSensor {
    fn name(&self) -> &str {
        &self.name
    }

    async fn read(&self) -> Result<SensorValues> {
        let state = self.step();
        let pm25 = state.pm25.round();
        let pm10 = (pm25 * 0.6).round();
        let pm100 = (pm25 * 1.3).round();

        // Counts per 0.1 L, each bin including every larger one.
        let counts = [
            pm25 * 90.0,
            pm25 * 27.0,
            pm25 * 5.0,
            pm25 * 0.6,
            pm25 * 0.2,
            pm25 * 0.05,
        ];

        let mut values = SensorValues::missing()
            .with(Field::Temperature, (state.temperature * 10.0).round() / 10.0)
            .with(Field::Humidity, (state.humidity * 10.0).round() / 10.0)
            .with(Field::Pressure, (state.pressure * 10.0).round() / 10.0)
            .with(Field::Pm10Standard, pm10)
            .with(Field::Pm25Standard, pm25)
            .with(Field::Pm100Standard, pm100)
            .with(Field::Pm10Env, pm10)
            .with(Field::Pm25Env, pm25)
            .with(Field::Pm100Env, pm100);
        for (field, count) in Field::PARTICLE_COUNTS.into_iter().zip(counts) {
            values.set(field, Some(count.round()));
        }
        Ok(values)
    }
}
