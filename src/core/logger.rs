//! Named logger handles

use super::{
    error::Result,
    log_level::LogLevel,
    record::{ArgValue, LogRecord},
};
use crate::dispatch::Dispatch;
use std::fmt;
use std::sync::Arc;

/// Cheap, cloneable handle for emitting records under one name.
///
/// Obtained from `LogSystem::logger`. Records below the system threshold are
/// counted as filtered and never reach the dispatcher.
#[derive(Clone)]
pub struct Logger {
    name: Arc<str>,
    threshold: LogLevel,
    dispatcher: Arc<dyn Dispatch>,
}

impl Logger {
    pub(crate) fn new(name: Arc<str>, threshold: LogLevel, dispatcher: Arc<dyn Dispatch>) -> Self {
        Self {
            name,
            threshold,
            dispatcher,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn threshold(&self) -> LogLevel {
        self.threshold
    }

    /// Whether a record at `level` would be dispatched
    #[inline]
    pub fn is_enabled(&self, level: LogLevel) -> bool {
        level.passes(self.threshold)
    }

    /// Emit `template` with positional `args`.
    ///
    /// # Errors
    ///
    /// In sync mode, the first sink failure. In every mode,
    /// [`LoggerError::LoggerStopped`](super::LoggerError::LoggerStopped)
    /// after shutdown.
    pub fn log(
        &self,
        level: LogLevel,
        template: impl Into<String>,
        args: Vec<ArgValue>,
    ) -> Result<()> {
        if !self.is_enabled(level) {
            self.dispatcher.metrics().record_filtered();
            return Ok(());
        }
        let record = LogRecord::new(level, Arc::clone(&self.name), template, args);
        self.dispatcher.emit(record)
    }

    pub fn trace(&self, message: impl Into<String>) -> Result<()> {
        self.log(LogLevel::Trace, message, Vec::new())
    }

    pub fn debug(&self, message: impl Into<String>) -> Result<()> {
        self.log(LogLevel::Debug, message, Vec::new())
    }

    pub fn info(&self, message: impl Into<String>) -> Result<()> {
        self.log(LogLevel::Info, message, Vec::new())
    }

    pub fn warn(&self, message: impl Into<String>) -> Result<()> {
        self.log(LogLevel::Warn, message, Vec::new())
    }

    pub fn error(&self, message: impl Into<String>) -> Result<()> {
        self.log(LogLevel::Error, message, Vec::new())
    }

    pub fn fatal(&self, message: impl Into<String>) -> Result<()> {
        self.log(LogLevel::Fatal, message, Vec::new())
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("name", &self.name)
            .field("threshold", &self.threshold)
            .field("mode", &self.dispatcher.mode())
            .finish()
    }
}
