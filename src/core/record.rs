//! Log record structure
//!
//! A [`LogRecord`] is created on the producer thread and never mutated
//! afterwards; the message is kept as a template plus positional arguments
//! and only rendered when a sink needs the text.

use super::log_level::LogLevel;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::fmt::{self, Write as _};
use std::sync::Arc;

// Thread-local caches for thread information to avoid repeated allocations
thread_local! {
    static THREAD_ID_CACHE: RefCell<Option<String>> = const { RefCell::new(None) };
    static THREAD_NAME_CACHE: RefCell<Option<Option<String>>> = const { RefCell::new(None) };
}

fn current_thread_id() -> String {
    THREAD_ID_CACHE.with(|cache| {
        cache
            .borrow_mut()
            .get_or_insert_with(|| format!("{:?}", std::thread::current().id()))
            .clone()
    })
}

fn current_thread_name() -> Option<String> {
    THREAD_NAME_CACHE.with(|cache| {
        cache
            .borrow_mut()
            .get_or_insert_with(|| std::thread::current().name().map(String::from))
            .clone()
    })
}

/// Positional argument substituted into a record's template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ArgValue {
    String(String),
    Int(i64),
    UInt(u64),
    Float(f64),
    Bool(bool),
    Null,
}

impl fmt::Display for ArgValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgValue::String(s) => write!(f, "{}", s),
            ArgValue::Int(i) => write!(f, "{}", i),
            ArgValue::UInt(u) => write!(f, "{}", u),
            ArgValue::Float(fl) => write!(f, "{}", fl),
            ArgValue::Bool(b) => write!(f, "{}", b),
            ArgValue::Null => write!(f, "null"),
        }
    }
}

impl From<String> for ArgValue {
    fn from(s: String) -> Self {
        ArgValue::String(s)
    }
}

impl From<&String> for ArgValue {
    fn from(s: &String) -> Self {
        ArgValue::String(s.clone())
    }
}

impl From<&str> for ArgValue {
    fn from(s: &str) -> Self {
        ArgValue::String(s.to_string())
    }
}

impl From<i64> for ArgValue {
    fn from(i: i64) -> Self {
        ArgValue::Int(i)
    }
}

impl From<i32> for ArgValue {
    fn from(i: i32) -> Self {
        ArgValue::Int(i64::from(i))
    }
}

impl From<u64> for ArgValue {
    fn from(u: u64) -> Self {
        ArgValue::UInt(u)
    }
}

impl From<u32> for ArgValue {
    fn from(u: u32) -> Self {
        ArgValue::UInt(u64::from(u))
    }
}

impl From<usize> for ArgValue {
    fn from(u: usize) -> Self {
        ArgValue::UInt(u as u64)
    }
}

impl From<f64> for ArgValue {
    fn from(f: f64) -> Self {
        ArgValue::Float(f)
    }
}

impl From<bool> for ArgValue {
    fn from(b: bool) -> Self {
        ArgValue::Bool(b)
    }
}

impl<T: Into<ArgValue>> From<Option<T>> for ArgValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(ArgValue::Null, Into::into)
    }
}

/// Substitute `{}` (next argument) and `{N}` (argument N) placeholders.
///
/// A placeholder with no matching argument is emitted verbatim; surplus
/// arguments are ignored.
pub fn render_template(template: &str, args: &[ArgValue]) -> String {
    let mut out = String::with_capacity(template.len() + args.len() * 8);
    let mut next = 0usize;
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];

        let Some(close) = after.find('}') else {
            out.push_str(&rest[open..]);
            return out;
        };

        let inner = &after[..close];
        if inner.contains('{') {
            out.push('{');
            rest = after;
            continue;
        }

        let index = if inner.is_empty() {
            let index = next;
            next += 1;
            Some(index)
        } else {
            inner.parse::<usize>().ok()
        };

        match index.and_then(|i| args.get(i)) {
            Some(value) => {
                let _ = write!(out, "{}", value);
            }
            None => {
                out.push('{');
                out.push_str(inner);
                out.push('}');
            }
        }
        rest = &after[close + 1..];
    }

    out.push_str(rest);
    out
}

/// Escape line breaks and tabs so one record always renders as one line
pub fn sanitize_message(message: &str) -> String {
    if !message.contains(['\n', '\r', '\t']) {
        return message.to_string();
    }
    message
        .replace('\n', "\\n")
        .replace('\r', "\\r")
        .replace('\t', "\\t")
}

#[derive(Debug, Clone)]
pub struct LogRecord {
    timestamp: DateTime<Utc>,
    level: LogLevel,
    logger_name: Arc<str>,
    thread_id: String,
    thread_name: Option<String>,
    template: String,
    args: Vec<ArgValue>,
}

impl LogRecord {
    /// Capture a record on the current thread, stamped with the current time
    pub fn new(
        level: LogLevel,
        logger_name: impl Into<Arc<str>>,
        template: impl Into<String>,
        args: Vec<ArgValue>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            level,
            logger_name: logger_name.into(),
            thread_id: current_thread_id(),
            thread_name: current_thread_name(),
            template: template.into(),
            args,
        }
    }

    /// Replace the capture time, mainly for replaying or testing
    #[must_use]
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn level(&self) -> LogLevel {
        self.level
    }

    pub fn logger_name(&self) -> &str {
        &self.logger_name
    }

    pub fn thread_id(&self) -> &str {
        &self.thread_id
    }

    pub fn thread_name(&self) -> Option<&str> {
        self.thread_name.as_deref()
    }

    /// Thread name when the thread has one, its id otherwise
    pub fn thread(&self) -> &str {
        self.thread_name.as_deref().unwrap_or(&self.thread_id)
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn args(&self) -> &[ArgValue] {
        &self.args
    }

    /// Rendered single-line message
    pub fn message(&self) -> String {
        if self.args.is_empty() {
            sanitize_message(&self.template)
        } else {
            sanitize_message(&render_template(&self.template, &self.args))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequential_placeholders() {
        let args = vec![ArgValue::from(3), ArgValue::from("five")];
        assert_eq!(
            render_template("Retry {} of {}", &args),
            "Retry 3 of five"
        );
    }

    #[test]
    fn test_indexed_placeholders() {
        let args = vec![ArgValue::from("a"), ArgValue::from("b")];
        assert_eq!(render_template("{1}{0}{1}", &args), "bab");
    }

    #[test]
    fn test_missing_and_surplus_arguments() {
        assert_eq!(render_template("x={} y={}", &[ArgValue::from(1)]), "x=1 y={}");
        assert_eq!(
            render_template("only {}", &[ArgValue::from(1), ArgValue::from(2)]),
            "only 1"
        );
        assert_eq!(render_template("{name} {7}", &[]), "{name} {7}");
    }

    #[test]
    fn test_unbalanced_braces() {
        assert_eq!(render_template("open { brace", &[ArgValue::from(1)]), "open { brace");
        assert_eq!(render_template("{ {}", &[ArgValue::from(1)]), "{ 1");
        assert_eq!(render_template("}{}", &[ArgValue::from(1)]), "}1");
    }

    #[test]
    fn test_message_is_single_line() {
        let record = LogRecord::new(
            LogLevel::Info,
            "test",
            "login {}",
            vec![ArgValue::from("bob\nERROR fake")],
        );
        assert_eq!(record.message(), "login bob\\nERROR fake");
    }

    #[test]
    fn test_record_captures_thread() {
        let handle = std::thread::Builder::new()
            .name("producer-7".to_string())
            .spawn(|| LogRecord::new(LogLevel::Debug, "worker", "tick", Vec::new()))
            .unwrap();
        let record = handle.join().unwrap();
        assert_eq!(record.thread(), "producer-7");
        assert!(record.thread_id().starts_with("ThreadId("));
        assert_eq!(record.logger_name(), "worker");
    }

    #[test]
    fn test_option_argument() {
        let none: Option<i32> = None;
        assert_eq!(ArgValue::from(none), ArgValue::Null);
        assert_eq!(ArgValue::from(Some(4)), ArgValue::Int(4));
    }
}
