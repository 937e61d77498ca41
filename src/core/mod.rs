//! Core types: records, levels, formatting, configuration and the registry

pub mod config;
pub mod error;
pub mod log_level;
pub mod logger;
pub mod metrics;
pub mod overflow_policy;
pub mod pattern;
pub mod record;
pub mod sink;
pub mod system;
pub mod timestamp;

pub use config::{
    ConsoleSettings, Configuration, LogSettings, RollingFileSettings, SinkConfig, PRESET_LOG_FILE,
};
pub use error::{LoggerError, Result};
pub use log_level::LogLevel;
pub use logger::Logger;
pub use metrics::DispatchMetrics;
pub use overflow_policy::{DispatchMode, ErrorCallback, OverflowCallback, OverflowPolicy};
pub use pattern::{PatternLayout, DEFAULT_PATTERN, LINE_SEPARATOR};
pub use record::{render_template, sanitize_message, ArgValue, LogRecord};
pub use sink::Sink;
pub use system::LogSystem;
pub use timestamp::{DatePattern, DEFAULT_DATE_PATTERN};
