//! The sampling daemon.
//!
//! The daemon runs as a single task and repeats sampling cycles until it is
//! cancelled:
//!
//! 1. Open a fresh log file named after the current time.
//! 2. Take `samples_per_file` samples. Each sample is stamped, read from the
//!    sensor, appended to the file, pushed onto the hand-off buffer and
//!    published to the latest-reading cache, in that order.
//! 3. Clear the hand-off buffer and start over.
//!
//! A sensor failure never ends the daemon: the sample is recorded with every
//! field missing. A failure to create or append to a log file does end it,
//! and the error is returned from [`SamplingDaemon::run`].
//!
//! Cancellation is observed while waiting on the sensor and while sleeping
//! between samples, so a stop request never waits out a full interval. A
//! sample that has been read is always written completely before the daemon
//! exits.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use envmon_types::{Reading, SensorValues, datetime_to_timestamp};

use crate::clock::Clock;
use crate::config::MonitorConfig;
use crate::error::Result;
use crate::events::{DaemonEvent, EventSender};
use crate::handoff::HandoffBuffer;
use crate::latest::LatestReadingCache;
use crate::rotator::FileRotator;
use crate::sensor::SensorSource;

/// Counters kept by the daemon while it runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DaemonStats {
    /// Sample lines appended to log files.
    pub samples_written: u64,
    /// Cycles that reached their full sample count.
    pub cycles_completed: u64,
    /// Samples recorded with missing values because the sensor failed.
    pub sensor_failures: u64,
    /// Hand-off buffer lines discarded at rotation boundaries.
    pub discarded_lines: u64,
}

/// The long-running sampling task.
pub struct SamplingDaemon {
    sensor: Arc<dyn SensorSource>,
    clock: Arc<dyn Clock>,
    rotator: FileRotator,
    handoff: Arc<HandoffBuffer>,
    latest: LatestReadingCache,
    events: EventSender,
    interval: Duration,
    samples_per_file: usize,
    stats: DaemonStats,
}

impl std::fmt::Debug for SamplingDaemon {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SamplingDaemon")
            .field("sensor", &self.sensor.name())
            .field("dir", &self.rotator.dir())
            .field("interval", &self.interval)
            .field("samples_per_file", &self.samples_per_file)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl SamplingDaemon {
    /// Create a daemon sharing `handoff`, `latest` and `events` with its owner.
    pub fn new(
        config: &MonitorConfig,
        sensor: Arc<dyn SensorSource>,
        clock: Arc<dyn Clock>,
        handoff: Arc<HandoffBuffer>,
        latest: LatestReadingCache,
        events: EventSender,
    ) -> Self {
        Self {
            sensor,
            clock,
            rotator: FileRotator::new(&config.data_dir),
            handoff,
            latest,
            events,
            interval: config.sampling_interval,
            samples_per_file: config.samples_per_file,
            stats: DaemonStats::default(),
        }
    }

    /// Run until `token` is cancelled or persistence fails.
    ///
    /// # Errors
    ///
    /// Returns the persistence error ([`Error::CreateLog`](crate::Error::CreateLog)
    /// or [`Error::AppendLog`](crate::Error::AppendLog)) that ended the daemon.
    pub async fn run(mut self, token: CancellationToken) -> Result<DaemonStats> {
        info!(
            "Sampling daemon started ({}, interval {:?}, {} samples per file, dir {})",
            self.sensor.name(),
            self.interval,
            self.samples_per_file,
            self.rotator.dir().display()
        );

        match self.run_cycles(&token).await {
            Ok(()) => {
                info!(
                    "Sampling daemon stopped after {} samples",
                    self.stats.samples_written
                );
                let _ = self.events.send(DaemonEvent::Stopped {
                    samples_written: self.stats.samples_written,
                });
                Ok(self.stats)
            }
            Err(e) => {
                error!("Sampling daemon failed: {}", e);
                let _ = self.events.send(DaemonEvent::Failed {
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }

    async fn run_cycles(&mut self, token: &CancellationToken) -> Result<()> {
        let mut cycle = 0u64;

        loop {
            cycle += 1;
            let path = self.rotator.open_cycle(&self.clock.now()).await?;
            info!("Cycle {} writing to {}", cycle, path.display());
            let _ = self.events.send(DaemonEvent::CycleStarted {
                cycle,
                path: path.clone(),
            });

            for index in 1..=self.samples_per_file {
                let timestamp = datetime_to_timestamp(&self.clock.now());

                let result = tokio::select! {
                    biased;
                    _ = token.cancelled() => return Ok(()),
                    result = self.sensor.read() => result,
                };

                let values = match result {
                    Ok(values) => values,
                    Err(e) => {
                        warn!("Sensor read failed, recording missing values: {}", e);
                        self.stats.sensor_failures += 1;
                        let _ = self.events.send(DaemonEvent::SensorFailed {
                            error: e.to_string(),
                        });
                        SensorValues::missing()
                    }
                };

                let reading = Reading::new(timestamp, values);
                let line = reading.to_line();
                self.rotator.append(&line).await?;
                self.stats.samples_written += 1;
                self.handoff.push(line.clone());
                self.latest.publish(line);
                debug!("Recorded sample {}/{}", index, self.samples_per_file);
                let _ = self.events.send(DaemonEvent::SampleRecorded { reading, index });

                tokio::select! {
                    biased;
                    _ = token.cancelled() => return Ok(()),
                    _ = pause(self.interval) => {}
                }
            }

            let discarded = self.handoff.clear();
            if discarded > 0 {
                debug!("Discarded {} unconsumed hand-off lines", discarded);
            }
            self.stats.discarded_lines += discarded as u64;
            self.stats.cycles_completed += 1;
            let _ = self.events.send(DaemonEvent::CycleCompleted {
                cycle,
                path,
                discarded,
            });
        }
    }
}

async fn pause(interval: Duration) {
    if interval.is_zero() {
        tokio::task::yield_now().await;
    } else {
        tokio::time::sleep(interval).await;
    }
}
