//! Declarative settings and their validated form
//!
//! [`LogSettings`] is the serde-facing description, loadable from JSON. It is
//! turned into an immutable [`Configuration`] exactly once by
//! [`Configuration::from_settings`], which checks every parameter and has no
//! side effects. Sinks are opened later, by `LogSystem::init`.

use super::{
    error::{LoggerError, Result},
    log_level::LogLevel,
    overflow_policy::{DispatchMode, OverflowPolicy},
    pattern::{PatternLayout, DEFAULT_PATTERN},
    sink::Sink,
};
use crate::dispatch::DEFAULT_QUEUE_CAPACITY;
use crate::sinks::{parse_byte_size, ConsoleSink, ConsoleTarget, RollingFilePolicy, RollingFileSink};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// File name used by [`Configuration::preset`]
pub const PRESET_LOG_FILE: &str = "LogTest.log";

const DEFAULT_DRAIN_TIMEOUT_MS: u64 = 5_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConsoleSettings {
    pub target: ConsoleTarget,
    pub use_colors: bool,
}

impl Default for ConsoleSettings {
    fn default() -> Self {
        Self {
            target: ConsoleTarget::Stdout,
            use_colors: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RollingFileSettings {
    pub path: PathBuf,
    /// Size with an optional unit, e.g. `"1 K"` or `"10 MB"`
    #[serde(default = "default_max_size")]
    pub max_size: String,
    #[serde(default = "default_max_backups")]
    pub max_backups: usize,
    #[serde(default)]
    pub compress: bool,
}

fn default_max_size() -> String {
    "10 MB".to_string()
}

fn default_max_backups() -> usize {
    5
}

/// Unvalidated logging settings
///
/// Missing fields take their defaults:
///
/// ```
/// use log_dispatch::core::{DispatchMode, LogLevel, LogSettings};
///
/// let settings = LogSettings::from_json_str(r#"{
///     "mode": "async_nonlocking",
///     "threshold": "WARN",
///     "rolling_file": { "path": "app.log", "max_size": "64 KB" }
/// }"#).unwrap();
///
/// assert_eq!(settings.mode, DispatchMode::AsyncNonlocking);
/// assert_eq!(settings.threshold, LogLevel::Warn);
/// assert_eq!(settings.queue_capacity, 1024);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogSettings {
    pub mode: DispatchMode,
    pub threshold: LogLevel,
    pub pattern: String,
    pub console: Option<ConsoleSettings>,
    pub rolling_file: Option<RollingFileSettings>,
    pub queue_capacity: usize,
    /// Defaults per mode when absent
    pub overflow_policy: Option<OverflowPolicy>,
    pub drain_timeout_ms: u64,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            mode: DispatchMode::default(),
            threshold: LogLevel::default(),
            pattern: DEFAULT_PATTERN.to_string(),
            console: Some(ConsoleSettings::default()),
            rolling_file: None,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            overflow_policy: None,
            drain_timeout_ms: DEFAULT_DRAIN_TIMEOUT_MS,
        }
    }
}

impl LogSettings {
    /// Console plus `LogTest.log` rolling at 1 KiB with 5 backups, DEBUG
    pub fn preset(mode: DispatchMode) -> Self {
        Self {
            mode,
            threshold: LogLevel::Debug,
            rolling_file: Some(RollingFileSettings {
                path: PathBuf::from(PRESET_LOG_FILE),
                max_size: "1 K".to_string(),
                max_backups: 5,
                compress: false,
            }),
            ..Self::default()
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            LoggerError::io_operation(
                "read settings",
                format!("Failed to read '{}'", path.display()),
                e,
            )
        })?;
        Self::from_json_str(&text)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// A validated sink description
#[derive(Debug, Clone, PartialEq)]
pub enum SinkConfig {
    Console {
        target: ConsoleTarget,
        use_colors: bool,
    },
    RollingFile {
        path: PathBuf,
        policy: RollingFilePolicy,
    },
}

impl SinkConfig {
    /// Open the sink. Fails fast on unwritable or locked files.
    pub fn open(&self) -> Result<Box<dyn Sink>> {
        Ok(match self {
            SinkConfig::Console { target, use_colors } => Box::new(
                ConsoleSink::new()
                    .with_target(*target)
                    .with_colors(*use_colors),
            ),
            SinkConfig::RollingFile { path, policy } => {
                Box::new(RollingFileSink::new(path, policy.clone())?)
            }
        })
    }
}

/// Validated, immutable logging configuration
#[derive(Debug, Clone)]
pub struct Configuration {
    sinks: Vec<SinkConfig>,
    layout: PatternLayout,
    mode: DispatchMode,
    threshold: LogLevel,
    queue_capacity: usize,
    overflow_policy: OverflowPolicy,
    drain_timeout: Duration,
}

impl Configuration {
    /// Validate `settings`.
    ///
    /// # Errors
    ///
    /// Returns [`LoggerError::InvalidConfiguration`] (or a formatter error
    /// for a bad pattern) when:
    /// - the pattern does not parse,
    /// - a rolling-file size, backup count or path is missing or not positive,
    /// - the queue capacity or drain timeout is zero,
    /// - the overflow policy is not available in the selected mode.
    pub fn from_settings(settings: &LogSettings) -> Result<Self> {
        let layout = PatternLayout::parse(&settings.pattern)?;

        if settings.queue_capacity == 0 {
            return Err(LoggerError::config("queue_capacity", "must be at least 1"));
        }
        if settings.drain_timeout_ms == 0 {
            return Err(LoggerError::config("drain_timeout_ms", "must be positive"));
        }

        let overflow_policy = settings
            .overflow_policy
            .unwrap_or_else(|| OverflowPolicy::default_for(settings.mode));
        if !overflow_policy.supported_by(settings.mode) {
            return Err(LoggerError::config(
                "overflow_policy",
                format!("{} is not available in {} mode", overflow_policy, settings.mode),
            ));
        }

        let mut sinks = Vec::new();
        if let Some(ref console) = settings.console {
            sinks.push(SinkConfig::Console {
                target: console.target,
                use_colors: console.use_colors,
            });
        }
        if let Some(ref file) = settings.rolling_file {
            sinks.push(validate_rolling_file(file)?);
        }

        Ok(Self {
            sinks,
            layout,
            mode: settings.mode,
            threshold: settings.threshold,
            queue_capacity: settings.queue_capacity,
            overflow_policy,
            drain_timeout: Duration::from_millis(settings.drain_timeout_ms),
        })
    }

    /// Validated form of [`LogSettings::preset`]
    pub fn preset(mode: DispatchMode) -> Result<Self> {
        Self::from_settings(&LogSettings::preset(mode))
    }

    /// Configured sinks. May be empty when sinks are supplied at init.
    pub fn sinks(&self) -> &[SinkConfig] {
        &self.sinks
    }

    pub fn layout(&self) -> &PatternLayout {
        &self.layout
    }

    pub fn pattern(&self) -> &str {
        self.layout.pattern()
    }

    pub fn mode(&self) -> DispatchMode {
        self.mode
    }

    pub fn threshold(&self) -> LogLevel {
        self.threshold
    }

    pub fn queue_capacity(&self) -> usize {
        self.queue_capacity
    }

    pub fn overflow_policy(&self) -> OverflowPolicy {
        self.overflow_policy
    }

    pub fn drain_timeout(&self) -> Duration {
        self.drain_timeout
    }
}

fn validate_rolling_file(file: &RollingFileSettings) -> Result<SinkConfig> {
    if file.path.as_os_str().is_empty() {
        return Err(LoggerError::config("rolling_file.path", "must not be empty"));
    }
    let max_size = parse_byte_size(&file.max_size)?;
    let policy = RollingFilePolicy::new(max_size, file.max_backups)?.with_compression(file.compress);
    Ok(SinkConfig::RollingFile {
        path: file.path.clone(),
        policy,
    })
}
