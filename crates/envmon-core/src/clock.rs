//! Wall-clock source for sample timestamps and log file names.

use std::fmt;

use chrono::{DateTime, Local};

/// Source of the current local time.
///
/// The daemon asks the clock once per cycle (for the log file name) and once
/// per sample (for the reading timestamp).
pub trait Clock: Send + Sync + fmt::Debug {
    /// The current local time.
    fn now(&self) -> DateTime<Local>;
}

/// The system clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}
