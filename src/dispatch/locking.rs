//! Asynchronous dispatch over a mutex-guarded queue

use super::{
    join_with_timeout, spawn_worker, write_batch, Dispatch, DispatchHooks, DrainReport, SinkSet,
    BATCH_SIZE, DEFAULT_SHUTDOWN_TIMEOUT,
};
use crate::core::{
    DispatchMetrics, DispatchMode, LogRecord, LoggerError, OverflowPolicy, Result,
};
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

struct QueueState {
    records: VecDeque<LogRecord>,
    stopped: bool,
}

struct Shared {
    state: Mutex<QueueState>,
    not_empty: Condvar,
    not_full: Condvar,
    /// Signalled after every batch so drains can re-check progress
    progress: Condvar,
    capacity: usize,
    policy: OverflowPolicy,
    metrics: DispatchMetrics,
    hooks: DispatchHooks,
}

impl Shared {
    fn settled(&self, target: u64) -> bool {
        self.metrics.processed() + self.metrics.discarded() >= target
    }
}

/// Producers enqueue under a mutex; one worker thread owns the sinks.
///
/// With [`OverflowPolicy::Block`] a full queue makes producers wait, so no
/// record is ever lost. The drop policies trade completeness for latency.
pub struct LockingDispatcher {
    shared: Arc<Shared>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl LockingDispatcher {
    /// Start the worker thread
    ///
    /// # Errors
    ///
    /// Returns an error if `capacity` is zero or the thread cannot start.
    pub fn spawn(
        capacity: usize,
        policy: OverflowPolicy,
        sinks: SinkSet,
        hooks: DispatchHooks,
    ) -> Result<Self> {
        if capacity == 0 {
            return Err(LoggerError::config("queue_capacity", "must be at least 1"));
        }

        let shared = Arc::new(Shared {
            state: Mutex::new(QueueState {
                records: VecDeque::with_capacity(capacity),
                stopped: false,
            }),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
            progress: Condvar::new(),
            capacity,
            policy,
            metrics: DispatchMetrics::new(),
            hooks,
        });

        let worker_shared = Arc::clone(&shared);
        let handle = spawn_worker("log-dispatch-locking", move || {
            run_worker(worker_shared, sinks)
        })?;

        Ok(Self {
            shared,
            worker: Mutex::new(Some(handle)),
        })
    }

    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }

    pub fn policy(&self) -> OverflowPolicy {
        self.shared.policy
    }

    /// Records currently waiting for the worker
    pub fn queued(&self) -> usize {
        self.shared.state.lock().records.len()
    }

    fn discard_queued(&self) -> u64 {
        let discarded = {
            let mut state = self.shared.state.lock();
            let n = state.records.len() as u64;
            state.records.clear();
            n
        };
        if discarded > 0 {
            self.shared.metrics.record_discarded(discarded);
            eprintln!(
                "[LOGGER WARNING] Drain timed out, {} queued records discarded",
                discarded
            );
        }
        self.shared.not_full.notify_all();
        discarded
    }
}

fn run_worker(shared: Arc<Shared>, mut sinks: SinkSet) {
    loop {
        let batch: Vec<LogRecord> = {
            let mut state = shared.state.lock();
            while state.records.is_empty() && !state.stopped {
                shared.not_empty.wait(&mut state);
            }
            if state.records.is_empty() {
                // Stopped and fully drained
                break;
            }
            let n = state.records.len().min(BATCH_SIZE);
            state.records.drain(..n).collect()
        };
        shared.not_full.notify_all();

        write_batch(&mut sinks, &batch, &shared.metrics, &shared.hooks);

        let _state = shared.state.lock();
        shared.progress.notify_all();
    }

    for error in sinks.flush() {
        shared.hooks.report_error(&shared.metrics, &error);
    }
}

impl Dispatch for LockingDispatcher {
    fn emit(&self, record: LogRecord) -> Result<()> {
        let shared = &self.shared;
        let mut state = shared.state.lock();
        if state.stopped {
            return Err(LoggerError::LoggerStopped);
        }

        let mut evicted = false;
        if state.records.len() >= shared.capacity {
            shared.metrics.record_queue_full();
            match shared.policy {
                OverflowPolicy::Block => {
                    shared.metrics.record_block();
                    while state.records.len() >= shared.capacity && !state.stopped {
                        shared.not_full.wait(&mut state);
                    }
                    if state.stopped {
                        return Err(LoggerError::LoggerStopped);
                    }
                }
                OverflowPolicy::DropOldest => {
                    state.records.pop_front();
                    evicted = true;
                }
                OverflowPolicy::DropNewest => {
                    drop(state);
                    shared.hooks.report_drop(&shared.metrics);
                    return Ok(());
                }
            }
        }

        state.records.push_back(record);
        // An eviction swaps one accepted record for another
        if !evicted {
            shared.metrics.record_accepted();
        }
        drop(state);
        shared.not_empty.notify_one();

        if evicted {
            shared.hooks.report_drop(&shared.metrics);
        }
        Ok(())
    }

    fn drain(&self, timeout: Duration) -> DrainReport {
        let shared = &self.shared;
        let deadline = Instant::now() + timeout;

        let settled = {
            let mut state = shared.state.lock();
            let target = shared.metrics.accepted();
            while !shared.settled(target) {
                if shared.progress.wait_until(&mut state, deadline).timed_out() {
                    break;
                }
            }
            shared.settled(target)
        };

        if settled {
            return DrainReport::snapshot(&shared.metrics, false);
        }

        self.discard_queued();
        DrainReport::snapshot(&shared.metrics, true)
    }

    fn shutdown(&self, timeout: Duration) -> DrainReport {
        let start = Instant::now();
        let mut report = self.drain(timeout);

        self.shared.state.lock().stopped = true;
        self.shared.not_empty.notify_all();
        self.shared.not_full.notify_all();

        if let Some(handle) = self.worker.lock().take() {
            let remaining = timeout.saturating_sub(start.elapsed());
            if !join_with_timeout(handle, remaining) {
                self.discard_queued();
                report.timed_out = true;
            }
        }

        DrainReport {
            timed_out: report.timed_out,
            ..DrainReport::snapshot(&self.shared.metrics, false)
        }
    }

    fn mode(&self) -> DispatchMode {
        DispatchMode::AsyncLocking
    }

    fn metrics(&self) -> &DispatchMetrics {
        &self.shared.metrics
    }
}

impl Drop for LockingDispatcher {
    fn drop(&mut self) {
        if self.worker.get_mut().is_some() {
            self.shutdown(DEFAULT_SHUTDOWN_TIMEOUT);
        }
    }
}
