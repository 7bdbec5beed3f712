//! Hand-off buffer between the sampling daemon and bulk consumers.
//!
//! The daemon is the only producer. Any number of consumers (for example a
//! live chart accumulating samples) may pop or drain concurrently at their own
//! pace. At every rotation boundary the daemon clears whatever is still queued,
//! so a consumer that polls less often than once per cycle will see gaps.
//! [`HandoffBuffer::discarded`] counts the lines lost that way.

use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam_queue::SegQueue;

/// Unbounded multi-producer, multi-consumer queue of raw sample lines.
#[derive(Debug, Default)]
pub struct HandoffBuffer {
    queue: SegQueue<String>,
    discarded: AtomicU64,
}

impl HandoffBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue a raw sample line.
    pub fn push(&self, line: String) {
        self.queue.push(line);
    }

    /// Dequeue the oldest line, if any.
    pub fn pop(&self) -> Option<String> {
        self.queue.pop()
    }

    /// Dequeue every line currently queued, oldest first.
    pub fn drain(&self) -> Vec<String> {
        std::iter::from_fn(|| self.queue.pop()).collect()
    }

    /// Discard every queued line and return how many were dropped.
    ///
    /// Used by the daemon at rotation boundaries.
    pub fn clear(&self) -> usize {
        let dropped = std::iter::from_fn(|| self.queue.pop()).count();
        self.discarded.fetch_add(dropped as u64, Ordering::Relaxed);
        dropped
    }

    /// Number of queued lines.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Whether the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Total lines dropped by [`clear`](Self::clear) since creation.
    pub fn discarded(&self) -> u64 {
        self.discarded.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_fifo_order() {
        let buffer = HandoffBuffer::new();
        buffer.push("a".into());
        buffer.push("b".into());
        assert_eq!(buffer.len(), 2);
        assert_eq!(buffer.pop().as_deref(), Some("a"));
        assert_eq!(buffer.drain(), vec!["b".to_string()]);
        assert!(buffer.is_empty());
        assert_eq!(buffer.pop(), None);
    }

    #[test]
    fn test_clear_counts_discarded() {
        let buffer = HandoffBuffer::new();
        for i in 0..3 {
            buffer.push(i.to_string());
        }
        assert_eq!(buffer.clear(), 3);
        assert!(buffer.is_empty());
        assert_eq!(buffer.discarded(), 3);

        buffer.push("x".into());
        buffer.drain();
        assert_eq!(buffer.clear(), 0);
        assert_eq!(buffer.discarded(), 3);
    }

    #[test]
    fn test_concurrent_consumers_see_each_line_once() {
        let buffer = Arc::new(HandoffBuffer::new());
        for i in 0..1000 {
            buffer.push(i.to_string());
        }

        let consumers: Vec<_> = (0..4)
            .map(|_| {
                let buffer = Arc::clone(&buffer);
                std::thread::spawn(move || {
                    let mut seen = Vec::new();
                    while let Some(line) = buffer.pop() {
                        seen.push(line);
                    }
                    seen
                })
            })
            .collect();

        let mut all: Vec<usize> = consumers
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .map(|s| s.parse().unwrap())
            .collect();
        all.sort_unstable();
        assert_eq!(all, (0..1000).collect::<Vec<_>>());
    }
}
