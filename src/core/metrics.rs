//! Dispatch metrics for observability
//!
//! Counters for every way a record can leave the pipeline: written by the
//! sinks, filtered by the threshold, dropped on overflow, or discarded when a
//! drain times out. Nothing is lost without a count.

use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics shared between producers and the dispatch worker
///
/// # Example
///
/// ```
/// use log_dispatch::DispatchMetrics;
///
/// let metrics = DispatchMetrics::new();
///
/// metrics.record_accepted();
/// metrics.record_processed();
/// metrics.record_dropped();
///
/// assert_eq!(metrics.processed(), 1);
/// assert_eq!(metrics.dropped(), 1);
/// ```
#[derive(Debug)]
pub struct DispatchMetrics {
    /// Records that passed the threshold and entered the dispatcher
    accepted: AtomicU64,

    /// Records handed to the sinks, successfully or not
    processed: AtomicU64,

    /// Records rejected by the threshold before dispatch
    filtered: AtomicU64,

    /// Records lost to queue overflow
    dropped: AtomicU64,

    /// Records still queued when a drain timed out
    discarded: AtomicU64,

    /// Failed sink writes
    write_errors: AtomicU64,

    /// Number of times the queue was found full
    queue_full_events: AtomicU64,

    /// Number of times a producer waited for queue space
    block_events: AtomicU64,
}

impl DispatchMetrics {
    /// Create a new metrics instance with all counters at zero
    pub const fn new() -> Self {
        Self {
            accepted: AtomicU64::new(0),
            processed: AtomicU64::new(0),
            filtered: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            discarded: AtomicU64::new(0),
            write_errors: AtomicU64::new(0),
            queue_full_events: AtomicU64::new(0),
            block_events: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn accepted(&self) -> u64 {
        self.accepted.load(Ordering::Acquire)
    }

    #[inline]
    pub fn processed(&self) -> u64 {
        self.processed.load(Ordering::Acquire)
    }

    #[inline]
    pub fn filtered(&self) -> u64 {
        self.filtered.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn discarded(&self) -> u64 {
        self.discarded.load(Ordering::Acquire)
    }

    #[inline]
    pub fn write_errors(&self) -> u64 {
        self.write_errors.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn queue_full_events(&self) -> u64 {
        self.queue_full_events.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn block_events(&self) -> u64 {
        self.block_events.load(Ordering::Relaxed)
    }

    /// Accepted records not yet processed or discarded
    pub fn pending(&self) -> u64 {
        self.accepted()
            .saturating_sub(self.processed() + self.discarded())
    }

    /// Returns the previous count, like the other `record_*` methods
    #[inline]
    pub fn record_accepted(&self) -> u64 {
        self.accepted.fetch_add(1, Ordering::AcqRel)
    }

    #[inline]
    pub fn record_processed(&self) -> u64 {
        self.processed.fetch_add(1, Ordering::AcqRel)
    }

    #[inline]
    pub fn record_processed_n(&self, n: u64) -> u64 {
        self.processed.fetch_add(n, Ordering::AcqRel)
    }

    #[inline]
    pub fn record_filtered(&self) -> u64 {
        self.filtered.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_dropped(&self) -> u64 {
        self.dropped.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_discarded(&self, n: u64) -> u64 {
        self.discarded.fetch_add(n, Ordering::AcqRel)
    }

    #[inline]
    pub fn record_write_error(&self) -> u64 {
        self.write_errors.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_queue_full(&self) -> u64 {
        self.queue_full_events.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_block(&self) -> u64 {
        self.block_events.fetch_add(1, Ordering::Relaxed)
    }

    /// Get drop rate as a percentage (0.0 - 100.0)
    ///
    /// Returns 0.0 if nothing reached the dispatcher.
    pub fn drop_rate(&self) -> f64 {
        let lost = (self.dropped() + self.discarded()) as f64;
        let total = self.accepted() as f64 + self.dropped() as f64;
        if total == 0.0 {
            0.0
        } else {
            (lost / total) * 100.0
        }
    }
}

impl Default for DispatchMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for DispatchMetrics {
    /// Create a snapshot of the current metrics values
    fn clone(&self) -> Self {
        Self {
            accepted: AtomicU64::new(self.accepted()),
            processed: AtomicU64::new(self.processed()),
            filtered: AtomicU64::new(self.filtered()),
            dropped: AtomicU64::new(self.dropped()),
            discarded: AtomicU64::new(self.discarded()),
            write_errors: AtomicU64::new(self.write_errors()),
            queue_full_events: AtomicU64::new(self.queue_full_events()),
            block_events: AtomicU64::new(self.block_events()),
        }
    }
}
