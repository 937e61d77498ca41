//! # Log Dispatch
//!
//! A logging-dispatch library: records are filtered by a root threshold,
//! rendered with a log4j-style pattern and routed to console and rolling-file
//! sinks under one of three dispatch modes.
//!
//! ## Modes
//!
//! - **Sync**: write on the calling thread; sink errors reach the caller.
//! - **AsyncLocking**: mutex-guarded bounded queue and one worker. Blocks
//!   producers on overflow unless a drop policy is configured.
//! - **AsyncNonlocking**: lock-free bounded queue and one worker. Overflow
//!   drops the incoming record and counts it.
//!
//! ## Example
//!
//! ```no_run
//! use log_dispatch::prelude::*;
//! use log_dispatch::info;
//! use std::time::Duration;
//!
//! let settings = LogSettings::preset(DispatchMode::AsyncLocking);
//! let system = LogSystem::init(Configuration::from_settings(&settings)?)?;
//!
//! let logger = system.logger("app");
//! info!(logger, "started, mode = {}", system.mode().to_string())?;
//!
//! system.shutdown(Duration::from_secs(5));
//! # Ok::<(), log_dispatch::LoggerError>(())
//! ```

pub mod core;
pub mod dispatch;
pub mod macros;
pub mod sinks;

pub mod prelude {
    pub use crate::core::{
        ArgValue, Configuration, DispatchMetrics, DispatchMode, LogLevel, LogRecord, LogSettings,
        LogSystem, Logger, LoggerError, OverflowPolicy, PatternLayout, Result, Sink,
    };
    pub use crate::dispatch::{DispatchHooks, DrainReport, DEFAULT_SHUTDOWN_TIMEOUT};
    pub use crate::sinks::{ConsoleSink, ConsoleTarget, RollingFilePolicy, RollingFileSink};
}

pub use crate::core::{
    ArgValue, Configuration, DatePattern, DispatchMetrics, DispatchMode, ErrorCallback, LogLevel,
    LogRecord, LogSettings, LogSystem, Logger, LoggerError, OverflowCallback, OverflowPolicy,
    PatternLayout, Result, Sink, DEFAULT_PATTERN,
};
pub use crate::dispatch::{Dispatch, DispatchHooks, DrainReport, DEFAULT_SHUTDOWN_TIMEOUT};
pub use crate::sinks::{ConsoleSink, ConsoleTarget, RollingFilePolicy, RollingFileSink};
