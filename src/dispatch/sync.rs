//! Synchronous dispatch on the calling thread

use super::{Dispatch, DrainReport, SinkSet};
use crate::core::{DispatchMetrics, DispatchMode, LogRecord, LoggerError, Result};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Formats and writes each record before `emit` returns.
///
/// The sinks sit behind one mutex, so lines from concurrent producers never
/// interleave. Sinks are flushed after every record.
pub struct SyncDispatcher {
    sinks: Mutex<SinkSet>,
    metrics: DispatchMetrics,
    stopped: AtomicBool,
}

impl SyncDispatcher {
    pub fn new(sinks: SinkSet) -> Self {
        Self {
            sinks: Mutex::new(sinks),
            metrics: DispatchMetrics::new(),
            stopped: AtomicBool::new(false),
        }
    }

    fn flush_sinks(&self) {
        for error in self.sinks.lock().flush() {
            self.metrics.record_write_error();
            eprintln!("[LOGGER ERROR] Sink flush failed: {}", error);
        }
    }
}

impl Dispatch for SyncDispatcher {
    fn emit(&self, record: LogRecord) -> Result<()> {
        if self.stopped.load(Ordering::Acquire) {
            return Err(LoggerError::LoggerStopped);
        }
        self.metrics.record_accepted();

        let mut errors = {
            let mut sinks = self.sinks.lock();
            let mut errors = sinks.write_record(&record);
            errors.extend(sinks.flush());
            errors
        };
        self.metrics.record_processed();

        if errors.is_empty() {
            return Ok(());
        }

        for _ in &errors {
            self.metrics.record_write_error();
        }
        let first = errors.remove(0);
        for other in errors {
            eprintln!("[LOGGER ERROR] Sink write failed: {}", other);
        }
        Err(first)
    }

    fn drain(&self, _timeout: Duration) -> DrainReport {
        // Nothing is ever queued
        self.flush_sinks();
        DrainReport::snapshot(&self.metrics, false)
    }

    fn shutdown(&self, _timeout: Duration) -> DrainReport {
        if !self.stopped.swap(true, Ordering::AcqRel) {
            self.flush_sinks();
        }
        DrainReport::snapshot(&self.metrics, false)
    }

    fn mode(&self) -> DispatchMode {
        DispatchMode::Sync
    }

    fn metrics(&self) -> &DispatchMetrics {
        &self.metrics
    }
}
