//! Lifecycle control for the sampling daemon and the latest-reading worker.
//!
//! A [`Monitor`] owns the shared pipelines (hand-off buffer, latest-reading
//! cache and event channel) and starts or stops both background tasks
//! together.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use envmon_types::Reading;

use crate::clock::{Clock, SystemClock};
use crate::config::MonitorConfig;
use crate::daemon::{DaemonStats, SamplingDaemon};
use crate::error::{Error, Result};
use crate::events::{EventReceiver, EventSender, event_channel};
use crate::handoff::HandoffBuffer;
use crate::latest::{LatestReadingCache, LatestWorker};
use crate::sensor::SensorSource;

/// Summary returned by [`Monitor::stop`].
#[derive(Debug, Clone, Copy, Serialize)]
pub struct StopReport {
    /// Counters from the daemon run.
    pub stats: DaemonStats,
    /// The latest-reading worker did not exit within the shutdown timeout.
    pub worker_timed_out: bool,
    /// How long the tasks were running.
    pub uptime: Duration,
}

#[derive(Debug)]
struct Running {
    token: CancellationToken,
    daemon: JoinHandle<Result<DaemonStats>>,
    worker: LatestWorker,
    started_at: Instant,
}

/// Starts and stops the sampling daemon and the latest-reading worker.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use std::time::Duration;
/// use envmon_core::{MockSensor, Monitor, MonitorConfig};
///
/// # #[tokio::main]
/// # async fn main() -> envmon_core::Result<()> {
/// let dir = std::env::temp_dir().join("envmon-doc-monitor");
/// let config = MonitorConfig::new(&dir).with_sampling_interval(Duration::from_millis(10));
/// let mut monitor = Monitor::new(config, Arc::new(MockSensor::new("bench")))?;
///
/// monitor.start()?;
/// tokio::time::sleep(Duration::from_millis(50)).await;
/// let report = monitor.stop().await?.expect("monitor was running");
/// assert!(report.stats.samples_written > 0);
/// # std::fs::remove_dir_all(&dir).ok();
/// # Ok(())
/// # }
/// ```
pub struct Monitor {
    config: MonitorConfig,
    sensor: Arc<dyn SensorSource>,
    clock: Arc<dyn Clock>,
    handoff: Arc<HandoffBuffer>,
    latest: LatestReadingCache,
    events: EventSender,
    running: Option<Running>,
}

impl std::fmt::Debug for Monitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Monitor")
            .field("config", &self.config)
            .field("sensor", &self.sensor.name())
            .field("running", &self.running.is_some())
            .finish_non_exhaustive()
    }
}

impl Monitor {
    /// Create a stopped monitor.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if `config` does not validate.
    pub fn new(config: MonitorConfig, sensor: Arc<dyn SensorSource>) -> Result<Self> {
        config.validate()?;
        let (events, _) = event_channel(config.event_capacity);
        Ok(Self {
            config,
            sensor,
            clock: Arc::new(SystemClock),
            handoff: Arc::new(HandoffBuffer::new()),
            latest: LatestReadingCache::new(),
            events,
            running: None,
        })
    }

    /// Replace the clock used for timestamps and file names.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// The monitor settings.
    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Start the daemon and the latest-reading worker.
    ///
    /// Calling `start` while already running does nothing.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TaskFailed`] when called outside a Tokio runtime.
    pub fn start(&mut self) -> Result<()> {
        if self.running.is_some() {
            warn!("Monitor already running, ignoring start");
            return Ok(());
        }
        tokio::runtime::Handle::try_current()
            .map_err(|e| Error::TaskFailed(format!("no async runtime: {e}")))?;

        let token = CancellationToken::new();
        let daemon = SamplingDaemon::new(
            &self.config,
            Arc::clone(&self.sensor),
            Arc::clone(&self.clock),
            Arc::clone(&self.handoff),
            self.latest.clone(),
            self.events.clone(),
        );
        let daemon = tokio::spawn(daemon.run(token.clone()));
        let worker = self.latest.spawn_worker(self.config.latest_poll);

        info!("Monitor started");
        self.running = Some(Running {
            token,
            daemon,
            worker,
            started_at: Instant::now(),
        });
        Ok(())
    }

    /// Stop both tasks and wait for them.
    ///
    /// The daemon finishes any sample it is writing and exits promptly even
    /// mid-interval. The worker gets [`MonitorConfig::shutdown_timeout`] to
    /// exit; if it does not, stopping completes anyway with a warning. Returns
    /// `Ok(None)` if the monitor was not running.
    ///
    /// # Errors
    ///
    /// Returns the persistence error that ended the daemon, if any, or
    /// [`Error::TaskFailed`] if the daemon task panicked.
    pub async fn stop(&mut self) -> Result<Option<StopReport>> {
        let Some(running) = self.running.take() else {
            return Ok(None);
        };

        running.token.cancel();
        let daemon_result = running
            .daemon
            .await
            .map_err(|e| Error::TaskFailed(format!("sampling daemon: {e}")));

        let worker_stopped = running.worker.stop(self.config.shutdown_timeout).await;
        if !worker_stopped {
            warn!(
                "Latest-reading worker did not exit within {:?}",
                self.config.shutdown_timeout
            );
        }

        let stats = daemon_result??;
        let uptime = running.started_at.elapsed();
        info!(
            "Monitor stopped after {:?} ({} samples, {} cycles completed)",
            uptime, stats.samples_written, stats.cycles_completed
        );

        Ok(Some(StopReport {
            stats,
            worker_timed_out: !worker_stopped,
            uptime,
        }))
    }

    /// Whether the tasks have been started and not yet stopped.
    ///
    /// This stays `true` after the daemon ends on its own because of a
    /// persistence failure; [`stop`](Self::stop) collects that error.
    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Whether the daemon task has exited while the monitor is still marked running.
    pub fn daemon_finished(&self) -> bool {
        self.running
            .as_ref()
            .is_some_and(|running| running.daemon.is_finished())
    }

    /// The hand-off buffer shared with the daemon.
    pub fn handoff(&self) -> Arc<HandoffBuffer> {
        Arc::clone(&self.handoff)
    }

    /// The most recent successfully parsed reading.
    pub fn get_latest(&self) -> Option<Reading> {
        self.latest.get_latest()
    }

    /// A handle to the latest-reading cache.
    pub fn latest_cache(&self) -> LatestReadingCache {
        self.latest.clone()
    }

    /// Subscribe to latest-reading snapshot changes.
    pub fn subscribe_latest(&self) -> tokio::sync::watch::Receiver<Option<Reading>> {
        self.latest.subscribe()
    }

    /// Subscribe to daemon events.
    pub fn subscribe_events(&self) -> EventReceiver {
        self.events.subscribe()
    }
}
