//! Daemon event notifications.
//!
//! The sampling daemon reports its progress on a broadcast channel. Events are
//! informational: the channel is lossy for slow subscribers and the daemon
//! never waits on it.

use std::path::PathBuf;

use serde::Serialize;
use tokio::sync::broadcast;

use envmon_types::Reading;

/// Events emitted by the sampling daemon.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new event types
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
#[non_exhaustive]
pub enum DaemonEvent {
    /// A fresh log file was created.
    CycleStarted { cycle: u64, path: PathBuf },
    /// A sample was written, buffered and published.
    SampleRecorded {
        reading: Reading,
        /// One-based position within the current cycle.
        index: usize,
    },
    /// The sensor failed; the sample was recorded with missing values.
    SensorFailed { error: String },
    /// The cycle reached its sample count and the hand-off buffer was reset.
    CycleCompleted {
        cycle: u64,
        path: PathBuf,
        /// Lines still queued in the hand-off buffer that were discarded.
        discarded: usize,
    },
    /// The daemon stopped after a stop request.
    Stopped { samples_written: u64 },
    /// The daemon stopped because data could no longer be persisted.
    Failed { error: String },
}

/// Sender for daemon events.
pub type EventSender = broadcast::Sender<DaemonEvent>;

/// Receiver for daemon events.
pub type EventReceiver = broadcast::Receiver<DaemonEvent>;

/// Create a new event channel with the given capacity.
pub fn event_channel(capacity: usize) -> (EventSender, EventReceiver) {
    broadcast::channel(capacity)
}
