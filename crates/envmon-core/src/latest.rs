//! Latest-reading cache.
//!
//! Raw sample lines are published into a single-slot queue. Publishing never
//! blocks: if a line is still pending it is evicted and replaced, so the most
//! recent publish always wins. A worker task drains the slot, parses the line
//! and, only when parsing succeeds, replaces the cached snapshot.
//!
//! Readers call [`LatestReadingCache::get_latest`], which returns a copy of
//! the snapshot and never waits on the worker.
//!
//! ```
//! use std::time::Duration;
//! use envmon_core::LatestReadingCache;
//! use envmon_types::Reading;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let cache = LatestReadingCache::new();
//! let worker = cache.spawn_worker(Duration::from_millis(100));
//!
//! cache.publish(Reading::missing(1.0).to_line());
//! let mut rx = cache.subscribe();
//! rx.wait_for(|r| r.is_some()).await.unwrap();
//! assert_eq!(cache.get_latest(), Some(Reading::missing(1.0)));
//!
//! assert!(worker.stop(Duration::from_secs(1)).await);
//! # }
//! ```

use std::sync::Arc;
use std::time::Duration;

use crossbeam_queue::ArrayQueue;
use tokio::sync::{Notify, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use envmon_types::Reading;

#[derive(Debug)]
enum SlotMessage {
    Sample(String),
    /// Forces the worker awake during shutdown.
    Wake,
}

#[derive(Debug)]
struct Shared {
    slot: ArrayQueue<SlotMessage>,
    notify: Notify,
    snapshot: watch::Sender<Option<Reading>>,
}

/// Single-slot, overwrite-on-full pipeline exposing the most recent parsed reading.
///
/// Cloning the cache is cheap and yields a handle to the same slot and snapshot.
#[derive(Debug, Clone)]
pub struct LatestReadingCache {
    shared: Arc<Shared>,
}

impl Default for LatestReadingCache {
    fn default() -> Self {
        Self::new()
    }
}

impl LatestReadingCache {
    /// Create an empty cache with no worker running.
    pub fn new() -> Self {
        let (snapshot, _) = watch::channel(None);
        Self {
            shared: Arc::new(Shared {
                slot: ArrayQueue::new(1),
                notify: Notify::new(),
                snapshot,
            }),
        }
    }

    /// Publish a raw sample line, evicting any line still pending.
    pub fn publish(&self, line: impl Into<String>) {
        if let Some(SlotMessage::Sample(stale)) =
            self.shared.slot.force_push(SlotMessage::Sample(line.into()))
        {
            debug!(stale = stale.trim_end(), "Replaced pending sample");
        }
        self.shared.notify.notify_one();
    }

    /// A copy of the most recent successfully parsed reading.
    pub fn get_latest(&self) -> Option<Reading> {
        *self.shared.snapshot.borrow()
    }

    /// Subscribe to snapshot changes.
    pub fn subscribe(&self) -> watch::Receiver<Option<Reading>> {
        self.shared.snapshot.subscribe()
    }

    /// Whether a published line is waiting for the worker.
    pub fn has_pending(&self) -> bool {
        !self.shared.slot.is_empty()
    }

    /// Spawn the worker that parses published lines into the snapshot.
    ///
    /// The worker wakes on every publish and at least every `poll` to check
    /// for cancellation.
    pub fn spawn_worker(&self, poll: Duration) -> LatestWorker {
        let token = CancellationToken::new();
        let handle = tokio::spawn(run_worker(self.clone(), token.clone(), poll));
        LatestWorker {
            cache: self.clone(),
            token,
            handle,
        }
    }

    fn wake(&self) {
        // A pending sample already wakes the worker; never evict it.
        let _ = self.shared.slot.push(SlotMessage::Wake);
        self.shared.notify.notify_one();
    }

    fn drain_slot(&self) {
        while let Some(message) = self.shared.slot.pop() {
            if let SlotMessage::Sample(line) = message {
                self.apply(&line);
            }
        }
    }

    /// Parse a line into the snapshot. Returns `false` and keeps the previous
    /// snapshot when the line is malformed.
    fn apply(&self, line: &str) -> bool {
        match Reading::parse_line(line) {
            Ok(reading) => {
                self.shared.snapshot.send_replace(Some(reading));
                true
            }
            Err(e) => {
                debug!(error = %e, "Ignoring malformed sample, keeping previous snapshot");
                false
            }
        }
    }
}

async fn run_worker(cache: LatestReadingCache, token: CancellationToken, poll: Duration) {
    debug!("Latest-reading worker started");
    loop {
        cache.drain_slot();

        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            _ = cache.shared.notify.notified() => {}
            _ = tokio::time::sleep(poll) => {}
        }
    }
    // Clears the shutdown sentinel and applies a sample published during stop.
    cache.drain_slot();
    debug!("Latest-reading worker stopped");
}

/// Handle to a running latest-reading worker.
#[derive(Debug)]
pub struct LatestWorker {
    cache: LatestReadingCache,
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl LatestWorker {
    /// Whether the worker task has exited.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Signal the worker to stop and wait up to `timeout` for it to exit.
    ///
    /// Returns `false` if the worker did not exit in time. The task is left
    /// detached in that case.
    pub async fn stop(self, timeout: Duration) -> bool {
        self.token.cancel();
        self.cache.wake();

        match tokio::time::timeout(timeout, self.handle).await {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                warn!(error = %e, "Latest-reading worker panicked");
                true
            }
            Err(_) => false,
        }
    }
}
