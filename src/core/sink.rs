//! Sink trait for log output destinations

use super::{error::Result, log_level::LogLevel};

/// Destination for formatted lines
///
/// Sinks are driven by a single thread at a time: the dispatch worker in the
/// async modes, or the producer holding the dispatcher's mutex in sync mode.
pub trait Sink: Send {
    /// Write one formatted line. `level` is the record's level, for sinks
    /// that colour or route by severity.
    fn write(&mut self, level: LogLevel, line: &str) -> Result<()>;
    fn flush(&mut self) -> Result<()>;
    fn name(&self) -> &str;
}
