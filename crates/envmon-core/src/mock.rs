//! Mock sensor and clock for testing.
//!
//! [`MockSensor`] implements [`SensorSource`] without any hardware and
//! [`SteppingClock`] implements [`Clock`] with deterministic time.
//!
//! # Features
//!
//! - **Scripted results**: Queue exact values or failures for successive reads
//! - **Failure injection**: Fail every read, or only the next few
//! - **Latency simulation**: Add artificial delays to simulate a slow sensor
//! - **Hold**: Block forever once the script runs out, so a test can stop the
//!   daemon at a known point

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Mutex as StdMutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Local, TimeDelta};
use tokio::sync::{Mutex, RwLock};

use envmon_types::{Field, SensorValues};

use crate::clock::Clock;
use crate::error::{Error, Result};
use crate::sensor::SensorSource;

/// A scripted read result.
pub type ScriptedRead = std::result::Result<SensorValues, String>;

/// A mock sensor for testing.
///
/// # Example
///
/// ```
/// use envmon_core::{MockSensor, SensorSource};
/// use envmon_types::{Field, SensorValues};
///
/// # #[tokio::main]
/// # async fn main() {
/// let sensor = MockSensor::scripted(
///     "bench",
///     [Ok(SensorValues::missing().with(Field::Temperature, 19.0)), Err("i2c timeout".into())],
/// );
/// assert_eq!(sensor.read().await.unwrap().temperature, Some(19.0));
/// assert!(sensor.read().await.is_err());
/// // Script exhausted: falls back to the default values.
/// assert!(sensor.read().await.is_ok());
/// assert_eq!(sensor.read_count(), 3);
/// # }
/// ```
pub struct MockSensor {
    name: String,
    values: RwLock<SensorValues>,
    script: Mutex<VecDeque<ScriptedRead>>,
    hold_when_exhausted: AtomicBool,
    read_count: AtomicU32,
    should_fail: AtomicBool,
    fail_message: RwLock<String>,
    /// Simulated read latency in milliseconds (0 = no delay).
    read_latency_ms: AtomicU64,
    /// Number of reads to fail before succeeding again.
    remaining_failures: AtomicU32,
}

impl std::fmt::Debug for MockSensor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockSensor")
            .field("name", &self.name)
            .field("read_count", &self.read_count.load(Ordering::Relaxed))
            .field("should_fail", &self.should_fail.load(Ordering::Relaxed))
            .finish()
    }
}

impl MockSensor {
    /// Create a mock sensor returning [`MockSensor::default_values`] on every read.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            values: RwLock::new(Self::default_values()),
            script: Mutex::new(VecDeque::new()),
            hold_when_exhausted: AtomicBool::new(false),
            read_count: AtomicU32::new(0),
            should_fail: AtomicBool::new(false),
            fail_message: RwLock::new("Mock failure".to_string()),
            read_latency_ms: AtomicU64::new(0),
            remaining_failures: AtomicU32::new(0),
        }
    }

    /// Create a mock sensor that returns `reads` in order before falling back
    /// to the default values.
    pub fn scripted(name: &str, reads: impl IntoIterator<Item = ScriptedRead>) -> Self {
        Self {
            script: Mutex::new(reads.into_iter().collect()),
            ..Self::new(name)
        }
    }

    /// Block forever once the script is exhausted instead of returning defaults.
    #[must_use]
    pub fn hold_when_exhausted(self) -> Self {
        self.hold_when_exhausted.store(true, Ordering::Relaxed);
        self
    }

    /// A complete, plausible set of values.
    pub fn default_values() -> SensorValues {
        SensorValues::missing()
            .with(Field::Temperature, 21.4)
            .with(Field::Humidity, 45.2)
            .with(Field::Pressure, 1013.2)
            .with(Field::Pm10Standard, 3.0)
            .with(Field::Pm25Standard, 5.0)
            .with(Field::Pm100Standard, 6.0)
            .with(Field::Pm10Env, 3.0)
            .with(Field::Pm25Env, 5.0)
            .with(Field::Pm100Env, 6.0)
            .with(Field::Particles03um, 510.0)
            .with(Field::Particles05um, 150.0)
            .with(Field::Particles10um, 30.0)
            .with(Field::Particles25um, 4.0)
            .with(Field::Particles50um, 1.0)
            .with(Field::Particles100um, 0.0)
    }

    /// Replace the values returned once the script is exhausted.
    pub async fn set_values(&self, values: SensorValues) {
        *self.values.write().await = values;
    }

    /// Append a result to the script.
    pub async fn push_read(&self, read: ScriptedRead) {
        self.script.lock().await.push_back(read);
    }

    /// Number of reads attempted so far.
    pub fn read_count(&self) -> u32 {
        self.read_count.load(Ordering::Relaxed)
    }

    /// Fail every read until cleared.
    pub async fn set_should_fail(&self, fail: bool, message: Option<&str>) {
        self.should_fail.store(fail, Ordering::Relaxed);
        if let Some(msg) = message {
            *self.fail_message.write().await = msg.to_string();
        }
    }

    /// Fail the next `count` reads, then succeed.
    pub fn set_transient_failures(&self, count: u32) {
        self.remaining_failures.store(count, Ordering::Relaxed);
    }

    /// Delay every read by `latency`.
    pub fn set_read_latency(&self, latency: Duration) {
        self.read_latency_ms
            .store(latency.as_millis() as u64, Ordering::Relaxed);
    }

    async fn check_should_fail(&self) -> Result<()> {
        let latency = self.read_latency_ms.load(Ordering::Relaxed);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }

        if self.remaining_failures.load(Ordering::Relaxed) > 0 {
            self.remaining_failures.fetch_sub(1, Ordering::Relaxed);
            return Err(Error::SensorRead(self.fail_message.read().await.clone()));
        }

        if self.should_fail.load(Ordering::Relaxed) {
            Err(Error::SensorRead(self.fail_message.read().await.clone()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl SensorSource for MockSensor {
    fn name(&self) -> &str {
        &self.name
    }

    async fn read(&self) -> Result<SensorValues> {
        self.read_count.fetch_add(1, Ordering::Relaxed);
        self.check_should_fail().await?;

        let next = self.script.lock().await.pop_front();
        match next {
            Some(Ok(values)) => Ok(values),
            Some(Err(message)) => Err(Error::SensorRead(message)),
            None if self.hold_when_exhausted.load(Ordering::Relaxed) => {
                std::future::pending().await
            }
            None => Ok(*self.values.read().await),
        }
    }
}

/// A clock that starts at a fixed time and advances by `step` on every call.
#[derive(Debug)]
pub struct SteppingClock {
    next: StdMutex<DateTime<Local>>,
    step: TimeDelta,
}

impl SteppingClock {
    /// Create a clock whose first reading is `start`.
    pub fn new(start: DateTime<Local>, step: TimeDelta) -> Self {
        Self {
            next: StdMutex::new(start),
            step,
        }
    }
}

impl Clock for SteppingClock {
    fn now(&self) -> DateTime<Local> {
        let mut next = self.next.lock().unwrap_or_else(|e| e.into_inner());
        let now = *next;
        *next = now + self.step;
        now
    }
}
