//! Dispatch strategies
//!
//! A dispatcher moves [`LogRecord`]s from producer threads to a [`SinkSet`].
//! Three strategies are provided:
//!
//! - [`SyncDispatcher`]: formats and writes on the calling thread.
//! - [`LockingDispatcher`]: mutex + condition variable queue, one worker.
//! - [`NonlockingDispatcher`]: lock-free bounded queue, one worker.
//!
//! In both async modes the worker owns the sinks, so sinks need no locking.

pub mod locking;
pub mod nonlocking;
pub mod sync;

pub use locking::LockingDispatcher;
pub use nonlocking::NonlockingDispatcher;
pub use sync::SyncDispatcher;

use crate::core::{
    DispatchMetrics, DispatchMode, ErrorCallback, LogRecord, LoggerError, OverflowCallback,
    OverflowPolicy, PatternLayout, Result, Sink,
};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Default time allowed for pending records when a dispatcher is dropped
/// without an explicit `shutdown()`.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Default bounded-queue size for both async modes
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// Records a worker takes from the queue before flushing the sinks
pub(crate) const BATCH_SIZE: usize = 50;

/// Routes records to sinks under one concurrency strategy
pub trait Dispatch: Send + Sync {
    /// Hand a record to the sinks.
    ///
    /// Sync mode returns the first sink error. Async modes only fail with
    /// [`LoggerError::LoggerStopped`]; overflow is counted, not raised.
    fn emit(&self, record: LogRecord) -> Result<()>;

    /// Wait until every record accepted before the call has been processed.
    /// Records still queued when `timeout` expires are discarded and counted.
    fn drain(&self, timeout: Duration) -> DrainReport;

    /// Drain, stop the worker and flush the sinks. Later emits fail with
    /// [`LoggerError::LoggerStopped`].
    fn shutdown(&self, timeout: Duration) -> DrainReport;

    fn mode(&self) -> DispatchMode;

    fn metrics(&self) -> &DispatchMetrics;
}

/// Outcome of a drain or shutdown, with running totals
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    pub processed: u64,
    pub dropped: u64,
    pub discarded: u64,
    pub pending: u64,
    pub timed_out: bool,
}

impl DrainReport {
    pub(crate) fn snapshot(metrics: &DispatchMetrics, timed_out: bool) -> Self {
        Self {
            processed: metrics.processed(),
            dropped: metrics.dropped(),
            discarded: metrics.discarded(),
            pending: metrics.pending(),
            timed_out,
        }
    }

    /// True when nothing was lost to overflow or a timeout
    pub fn is_lossless(&self) -> bool {
        self.dropped == 0 && self.discarded == 0 && !self.timed_out
    }
}

/// Optional notifications for overflow and worker-side sink failures
#[derive(Clone, Default)]
pub struct DispatchHooks {
    pub on_overflow: Option<OverflowCallback>,
    pub on_error: Option<ErrorCallback>,
}

impl DispatchHooks {
    pub(crate) fn report_drop(&self, metrics: &DispatchMetrics) {
        let total = metrics.record_dropped() + 1;

        // Alert on first drop and periodically thereafter
        if total == 1 || total % 1000 == 0 {
            eprintln!(
                "[LOGGER WARNING] Queue full, {} records dropped. \
                 Consider increasing queue_capacity or using the Block policy.",
                total
            );
        }

        if let Some(ref callback) = self.on_overflow {
            callback(total);
        }
    }

    pub(crate) fn report_error(&self, metrics: &DispatchMetrics, error: &LoggerError) {
        metrics.record_write_error();
        eprintln!("[LOGGER ERROR] Sink write failed: {}", error);
        if let Some(ref callback) = self.on_error {
            callback(error);
        }
    }
}

/// The sinks of one configuration together with their layout
pub struct SinkSet {
    sinks: Vec<Box<dyn Sink>>,
    layout: Arc<PatternLayout>,
}

impl SinkSet {
    pub fn new(sinks: Vec<Box<dyn Sink>>, layout: PatternLayout) -> Self {
        Self {
            sinks,
            layout: Arc::new(layout),
        }
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    pub fn layout(&self) -> &PatternLayout {
        &self.layout
    }

    /// Format once and write to every sink.
    ///
    /// Each sink is isolated: an error or panic in one does not stop the
    /// others. Returns the failures, empty on success.
    pub fn write_record(&mut self, record: &LogRecord) -> Vec<LoggerError> {
        let line = self.layout.format(record);
        let level = record.level();
        let mut errors = Vec::new();

        for sink in self.sinks.iter_mut() {
            let result =
                std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| sink.write(level, &line)));
            match result {
                Ok(Ok(())) => {}
                Ok(Err(e)) => errors.push(e),
                Err(panic_info) => {
                    errors.push(LoggerError::sink_panicked(sink.name(), panic_message(&panic_info)))
                }
            }
        }

        errors
    }

    /// Flush every sink, collecting failures
    pub fn flush(&mut self) -> Vec<LoggerError> {
        let mut errors = Vec::new();
        for sink in self.sinks.iter_mut() {
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| sink.flush()));
            match result {
                Ok(Ok(())) => {}
                Ok(Err(e)) => errors.push(e),
                Err(panic_info) => {
                    errors.push(LoggerError::sink_panicked(sink.name(), panic_message(&panic_info)))
                }
            }
        }
        errors
    }
}

/// Start the dispatcher for `mode`
///
/// # Errors
///
/// Fails when the worker thread cannot be spawned.
pub fn spawn(
    mode: DispatchMode,
    queue_capacity: usize,
    overflow_policy: OverflowPolicy,
    sinks: SinkSet,
    hooks: DispatchHooks,
) -> Result<Arc<dyn Dispatch>> {
    Ok(match mode {
        DispatchMode::Sync => Arc::new(SyncDispatcher::new(sinks)),
        DispatchMode::AsyncLocking => Arc::new(LockingDispatcher::spawn(
            queue_capacity,
            overflow_policy,
            sinks,
            hooks,
        )?),
        DispatchMode::AsyncNonlocking => {
            Arc::new(NonlockingDispatcher::spawn(queue_capacity, sinks, hooks)?)
        }
    })
}

/// Write a batch taken off a queue, then flush. `processed` is bumped only
/// after the flush so a drain that observes it also sees the bytes.
pub(crate) fn write_batch(
    sinks: &mut SinkSet,
    batch: &[LogRecord],
    metrics: &DispatchMetrics,
    hooks: &DispatchHooks,
) {
    for record in batch {
        for error in sinks.write_record(record) {
            hooks.report_error(metrics, &error);
        }
    }
    for error in sinks.flush() {
        hooks.report_error(metrics, &error);
    }
    metrics.record_processed_n(batch.len() as u64);
}

pub(crate) fn spawn_worker<F>(name: &str, body: F) -> Result<JoinHandle<()>>
where
    F: FnOnce() + Send + 'static,
{
    thread::Builder::new()
        .name(name.to_string())
        .spawn(body)
        .map_err(|e| {
            LoggerError::io_operation("spawn dispatch worker", format!("Failed to start '{}'", name), e)
        })
}

/// Join a worker, giving up after `timeout`. Returns true on a clean exit.
pub(crate) fn join_with_timeout(handle: JoinHandle<()>, timeout: Duration) -> bool {
    let start = Instant::now();

    loop {
        if handle.is_finished() {
            if let Err(e) = handle.join() {
                eprintln!("[LOGGER CRITICAL] Dispatch worker panicked during shutdown: {:?}", e);
                return false;
            }
            return true;
        }

        if start.elapsed() >= timeout {
            eprintln!(
                "[LOGGER WARNING] Dispatch worker did not finish within {:?}. \
                 Queued records were discarded.",
                timeout
            );
            return false;
        }

        thread::sleep(Duration::from_millis(1));
    }
}

fn panic_message(panic_info: &Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = panic_info.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic_info.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}
