//! Overflow policies for the asynchronous dispatch queues
//!
//! When a bounded queue is full, the policy decides between backpressure and
//! loss. Loss is never silent: every dropped record is counted and reported
//! to the overflow callback.

use super::error::LoggerError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Policy for a full dispatch queue
///
/// # Example
///
/// ```
/// use log_dispatch::{DispatchMode, OverflowPolicy};
///
/// assert_eq!(OverflowPolicy::default_for(DispatchMode::AsyncLocking), OverflowPolicy::Block);
/// assert_eq!(OverflowPolicy::default_for(DispatchMode::AsyncNonlocking), OverflowPolicy::DropNewest);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Block the producer until the worker frees a slot
    Block,

    /// Evict the oldest queued record to make room
    DropOldest,

    /// Reject the incoming record
    DropNewest,
}

impl OverflowPolicy {
    /// Policy used when the configuration leaves it unset
    pub fn default_for(mode: DispatchMode) -> Self {
        match mode {
            DispatchMode::Sync | DispatchMode::AsyncLocking => OverflowPolicy::Block,
            DispatchMode::AsyncNonlocking => OverflowPolicy::DropNewest,
        }
    }

    /// Whether the mode's queue can enforce this policy.
    ///
    /// The lock-free queue cannot park producers or reach its head from the
    /// producer side, so it only supports `DropNewest`.
    pub fn supported_by(&self, mode: DispatchMode) -> bool {
        match mode {
            DispatchMode::Sync | DispatchMode::AsyncLocking => true,
            DispatchMode::AsyncNonlocking => *self == OverflowPolicy::DropNewest,
        }
    }
}

impl fmt::Display for OverflowPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OverflowPolicy::Block => write!(f, "Block"),
            OverflowPolicy::DropOldest => write!(f, "DropOldest"),
            OverflowPolicy::DropNewest => write!(f, "DropNewest"),
        }
    }
}

/// Strategy used to move records from producers to sinks
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchMode {
    /// Format and write on the calling thread
    Sync,

    /// Mutex-guarded bounded queue drained by one worker thread
    #[default]
    AsyncLocking,

    /// Lock-free bounded queue drained by one worker thread
    AsyncNonlocking,
}

impl DispatchMode {
    pub const ALL: [DispatchMode; 3] = [
        DispatchMode::Sync,
        DispatchMode::AsyncLocking,
        DispatchMode::AsyncNonlocking,
    ];

    /// Background threads the mode runs
    pub fn worker_threads(&self) -> usize {
        match self {
            DispatchMode::Sync => 0,
            DispatchMode::AsyncLocking | DispatchMode::AsyncNonlocking => 1,
        }
    }

    pub fn is_async(&self) -> bool {
        self.worker_threads() > 0
    }
}

impl fmt::Display for DispatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchMode::Sync => write!(f, "Synchronous"),
            DispatchMode::AsyncLocking => write!(f, "AsyncLocking"),
            DispatchMode::AsyncNonlocking => write!(f, "AsyncNonlocking"),
        }
    }
}

impl std::str::FromStr for DispatchMode {
    type Err = LoggerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, '_' | '-' | ' '))
            .collect::<String>()
            .to_lowercase();
        match normalized.as_str() {
            "sync" | "synchronous" => Ok(DispatchMode::Sync),
            "asynclocking" | "locking" => Ok(DispatchMode::AsyncLocking),
            "asyncnonlocking" | "nonlocking" | "lockfree" => Ok(DispatchMode::AsyncNonlocking),
            _ => Err(LoggerError::config(
                "dispatch mode",
                format!(
                    "unknown mode '{}', expected sync, async_locking or async_nonlocking",
                    s
                ),
            )),
        }
    }
}

/// Callback for overflow notifications
///
/// Called when records are dropped because a queue is full.
/// The parameter is the total count of dropped records so far.
pub type OverflowCallback = Arc<dyn Fn(u64) + Send + Sync>;

/// Callback for sink failures on the dispatch worker
///
/// Async modes never raise sink errors on producer threads; they are counted
/// and handed to this callback instead.
pub type ErrorCallback = Arc<dyn Fn(&LoggerError) + Send + Sync>;
