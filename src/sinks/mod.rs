//! Sink implementations

pub mod console;
pub mod rolling_file;

pub use console::{ConsoleSink, ConsoleTarget};
pub use rolling_file::{parse_byte_size, RollingFilePolicy, RollingFileSink, MAX_BACKUP_COUNT};

pub use crate::core::Sink;
