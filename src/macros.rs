//! Logging macros with positional arguments.
//!
//! Arguments are converted into [`ArgValue`](crate::ArgValue)s and substituted
//! into the template's `{}` / `{N}` placeholders when the record is formatted,
//! so a filtered record never renders its message. Every macro evaluates to
//! the `Result` of [`Logger::log`](crate::Logger::log).
//!
//! # Examples
//!
//! ```
//! use log_dispatch::prelude::*;
//! use log_dispatch::{info, warn};
//!
//! let settings = LogSettings { console: None, ..LogSettings::default() };
//! let system = LogSystem::init(Configuration::from_settings(&settings).unwrap()).unwrap();
//! let logger = system.logger("server");
//!
//! info!(logger, "Server started").unwrap();
//! info!(logger, "Listening on port {}", 8080).unwrap();
//! warn!(logger, "Retry {} of {}", 1, 3).unwrap();
//! ```

/// Log at an explicit level.
///
/// ```
/// # use log_dispatch::prelude::*;
/// # let settings = LogSettings { console: None, ..LogSettings::default() };
/// # let system = LogSystem::init(Configuration::from_settings(&settings).unwrap()).unwrap();
/// # let logger = system.logger("doc");
/// use log_dispatch::log;
/// log!(logger, LogLevel::Error, "Error code: {}", 500).unwrap();
/// ```
#[macro_export]
macro_rules! log {
    ($logger:expr, $level:expr, $template:expr $(, $arg:expr)* $(,)?) => {
        $logger.log(
            $level,
            $template,
            ::std::vec![$($crate::ArgValue::from($arg)),*],
        )
    };
}

#[macro_export]
macro_rules! trace {
    ($logger:expr, $($rest:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Trace, $($rest)+)
    };
}

#[macro_export]
macro_rules! debug {
    ($logger:expr, $($rest:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Debug, $($rest)+)
    };
}

#[macro_export]
macro_rules! info {
    ($logger:expr, $($rest:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Info, $($rest)+)
    };
}

#[macro_export]
macro_rules! warn {
    ($logger:expr, $($rest:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Warn, $($rest)+)
    };
}

#[macro_export]
macro_rules! error {
    ($logger:expr, $($rest:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Error, $($rest)+)
    };
}

#[macro_export]
macro_rules! fatal {
    ($logger:expr, $($rest:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Fatal, $($rest)+)
    };
}
