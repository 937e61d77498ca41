//! Explicit logging registry

use super::{
    config::{Configuration, SinkConfig},
    error::Result,
    logger::Logger,
    metrics::DispatchMetrics,
    overflow_policy::DispatchMode,
    sink::Sink,
};
use crate::dispatch::{self, Dispatch, DispatchHooks, DrainReport, SinkSet};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Process-wide logging state, created by [`LogSystem::init`] and torn down
/// by [`LogSystem::shutdown`] (or on drop).
///
/// There is no global instance: the application owns the `LogSystem` and
/// passes [`Logger`] handles to the code that needs them.
///
/// # Example
///
/// ```no_run
/// use log_dispatch::core::{Configuration, DispatchMode, LogSystem};
/// use std::time::Duration;
///
/// let config = Configuration::preset(DispatchMode::AsyncLocking).unwrap();
/// let system = LogSystem::init(config).unwrap();
///
/// let logger = system.logger("app");
/// logger.info("started").unwrap();
///
/// let report = system.shutdown(Duration::from_secs(5));
/// assert!(report.is_lossless());
/// ```
pub struct LogSystem {
    configuration: Configuration,
    dispatcher: Arc<dyn Dispatch>,
    loggers: RwLock<HashMap<String, Logger>>,
    shut_down: AtomicBool,
}

impl LogSystem {
    /// Open the configured sinks and start the dispatcher
    ///
    /// # Errors
    ///
    /// Fails when a sink cannot be opened (unwritable path, file already
    /// locked) or the worker thread cannot start.
    pub fn init(configuration: Configuration) -> Result<Self> {
        Self::init_with(configuration, Vec::new(), DispatchHooks::default())
    }

    /// Like [`init`](Self::init), with additional sinks appended after the
    /// configured ones and optional overflow / error callbacks.
    pub fn init_with(
        configuration: Configuration,
        extra_sinks: Vec<Box<dyn Sink>>,
        hooks: DispatchHooks,
    ) -> Result<Self> {
        let mut sinks = configuration
            .sinks()
            .iter()
            .map(SinkConfig::open)
            .collect::<Result<Vec<_>>>()?;
        sinks.extend(extra_sinks);

        let sink_set = SinkSet::new(sinks, configuration.layout().clone());
        let dispatcher = dispatch::spawn(
            configuration.mode(),
            configuration.queue_capacity(),
            configuration.overflow_policy(),
            sink_set,
            hooks,
        )?;

        Ok(Self {
            configuration,
            dispatcher,
            loggers: RwLock::new(HashMap::new()),
            shut_down: AtomicBool::new(false),
        })
    }

    /// Handle for `name`. Repeated calls return clones of one cached handle.
    pub fn logger(&self, name: &str) -> Logger {
        if let Some(logger) = self.loggers.read().get(name) {
            return logger.clone();
        }

        self.loggers
            .write()
            .entry(name.to_string())
            .or_insert_with(|| {
                Logger::new(
                    Arc::from(name),
                    self.configuration.threshold(),
                    Arc::clone(&self.dispatcher),
                )
            })
            .clone()
    }

    /// Handle named after a type, the way class-named loggers are
    pub fn logger_for<T: ?Sized>(&self) -> Logger {
        self.logger(std::any::type_name::<T>())
    }

    /// Number of distinct logger names handed out
    pub fn logger_count(&self) -> usize {
        self.loggers.read().len()
    }

    pub fn drain(&self, timeout: Duration) -> DrainReport {
        self.dispatcher.drain(timeout)
    }

    /// Drain, stop the dispatcher and flush sinks. Handles obtained earlier
    /// get `LoggerStopped` from then on.
    pub fn shutdown(&self, timeout: Duration) -> DrainReport {
        self.shut_down.store(true, Ordering::Release);
        let report = self.dispatcher.shutdown(timeout);

        if !report.is_lossless() {
            eprintln!(
                "[LOGGER WARNING] Logging shut down with losses: {} dropped, {} discarded{}",
                report.dropped,
                report.discarded,
                if report.timed_out { ", timed out" } else { "" }
            );
        }
        report
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::Acquire)
    }

    pub fn metrics(&self) -> &DispatchMetrics {
        self.dispatcher.metrics()
    }

    pub fn mode(&self) -> DispatchMode {
        self.dispatcher.mode()
    }

    pub fn configuration(&self) -> &Configuration {
        &self.configuration
    }
}

impl Drop for LogSystem {
    fn drop(&mut self) {
        if !self.is_shut_down() {
            self.shutdown(self.configuration.drain_timeout());
        }
    }
}
