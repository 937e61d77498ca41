//! Asynchronous dispatch over a lock-free bounded channel

use super::{
    join_with_timeout, spawn_worker, write_batch, Dispatch, DispatchHooks, DrainReport, SinkSet,
    BATCH_SIZE, DEFAULT_SHUTDOWN_TIMEOUT,
};
use crate::core::{DispatchMetrics, DispatchMode, LogRecord, LoggerError, Result};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// How long the idle worker waits before re-checking the stop flag
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Producers never take a lock: `emit` is a single `try_send`.
///
/// A full queue drops the incoming record, counting it and notifying the
/// overflow callback. Blocking is not available in this mode.
pub struct NonlockingDispatcher {
    sender: Sender<LogRecord>,
    /// Kept for discarding the backlog when a drain times out
    receiver: Receiver<LogRecord>,
    running: Arc<AtomicBool>,
    metrics: Arc<DispatchMetrics>,
    hooks: DispatchHooks,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl NonlockingDispatcher {
    /// Start the worker thread
    ///
    /// # Errors
    ///
    /// Returns an error if `capacity` is zero or the thread cannot start.
    pub fn spawn(capacity: usize, sinks: SinkSet, hooks: DispatchHooks) -> Result<Self> {
        if capacity == 0 {
            return Err(LoggerError::config("queue_capacity", "must be at least 1"));
        }

        let (sender, receiver) = bounded(capacity);
        let running = Arc::new(AtomicBool::new(true));
        let metrics = Arc::new(DispatchMetrics::new());

        let worker = {
            let receiver = receiver.clone();
            let running = Arc::clone(&running);
            let metrics = Arc::clone(&metrics);
            let hooks = hooks.clone();
            spawn_worker("log-dispatch-nonlocking", move || {
                run_worker(receiver, running, sinks, metrics, hooks)
            })?
        };

        Ok(Self {
            sender,
            receiver,
            running,
            metrics,
            hooks,
            worker: Mutex::new(Some(worker)),
        })
    }

    pub fn capacity(&self) -> usize {
        self.sender.capacity().unwrap_or(0)
    }

    /// Records currently waiting for the worker
    pub fn queued(&self) -> usize {
        self.sender.len()
    }

    fn settled(&self, target: u64) -> bool {
        self.metrics.processed() + self.metrics.discarded() >= target
    }

    fn discard_queued(&self) -> u64 {
        let mut discarded = 0u64;
        while self.receiver.try_recv().is_ok() {
            discarded += 1;
        }
        if discarded > 0 {
            self.metrics.record_discarded(discarded);
            eprintln!(
                "[LOGGER WARNING] Drain timed out, {} queued records discarded",
                discarded
            );
        }
        discarded
    }
}

fn run_worker(
    receiver: Receiver<LogRecord>,
    running: Arc<AtomicBool>,
    mut sinks: SinkSet,
    metrics: Arc<DispatchMetrics>,
    hooks: DispatchHooks,
) {
    let mut batch = Vec::with_capacity(BATCH_SIZE);

    loop {
        match receiver.recv_timeout(POLL_INTERVAL) {
            Ok(record) => batch.push(record),
            Err(RecvTimeoutError::Timeout) => {
                if running.load(Ordering::Acquire) {
                    continue;
                }
                // Stopped and idle
                break;
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }

        while batch.len() < BATCH_SIZE {
            match receiver.try_recv() {
                Ok(record) => batch.push(record),
                Err(_) => break,
            }
        }

        write_batch(&mut sinks, &batch, &metrics, &hooks);
        batch.clear();
    }

    for error in sinks.flush() {
        hooks.report_error(&metrics, &error);
    }
}

impl Dispatch for NonlockingDispatcher {
    fn emit(&self, record: LogRecord) -> Result<()> {
        if !self.running.load(Ordering::Acquire) {
            return Err(LoggerError::LoggerStopped);
        }

        match self.sender.try_send(record) {
            Ok(()) => {
                self.metrics.record_accepted();
                Ok(())
            }
            Err(TrySendError::Full(_)) => {
                self.metrics.record_queue_full();
                self.hooks.report_drop(&self.metrics);
                Ok(())
            }
            Err(TrySendError::Disconnected(_)) => Err(LoggerError::LoggerStopped),
        }
    }

    fn drain(&self, timeout: Duration) -> DrainReport {
        let deadline = Instant::now() + timeout;
        let target = self.metrics.accepted();

        while !self.settled(target) {
            if Instant::now() >= deadline {
                self.discard_queued();
                return DrainReport::snapshot(&self.metrics, !self.settled(target));
            }
            thread::sleep(Duration::from_millis(1));
        }

        DrainReport::snapshot(&self.metrics, false)
    }

    fn shutdown(&self, timeout: Duration) -> DrainReport {
        let start = Instant::now();
        let report = self.drain(timeout);
        let mut timed_out = report.timed_out;

        self.running.store(false, Ordering::Release);

        if let Some(handle) = self.worker.lock().take() {
            let remaining = timeout.saturating_sub(start.elapsed());
            if !join_with_timeout(handle, remaining) {
                timed_out = true;
            }
            // Anything that slipped in after the drain
            self.discard_queued();
        }

        DrainReport {
            timed_out,
            ..DrainReport::snapshot(&self.metrics, false)
        }
    }

    fn mode(&self) -> DispatchMode {
        DispatchMode::AsyncNonlocking
    }

    fn metrics(&self) -> &DispatchMetrics {
        &self.metrics
    }
}

impl Drop for NonlockingDispatcher {
    fn drop(&mut self) {
        if self.worker.get_mut().is_some() {
            self.shutdown(DEFAULT_SHUTDOWN_TIMEOUT);
        }
    }
}
