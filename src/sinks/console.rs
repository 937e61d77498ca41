//! Console sink implementation

use crate::core::{LogLevel, Result, Sink};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::io::Write;

/// Stream a [`ConsoleSink`] writes to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsoleTarget {
    #[default]
    Stdout,
    Stderr,
}

pub struct ConsoleSink {
    target: ConsoleTarget,
    use_colors: bool,
}

impl ConsoleSink {
    pub fn new() -> Self {
        Self {
            target: ConsoleTarget::Stdout,
            use_colors: false,
        }
    }

    /// Select stdout or stderr
    ///
    /// # Example
    ///
    /// ```
    /// use log_dispatch::sinks::{ConsoleSink, ConsoleTarget};
    ///
    /// let sink = ConsoleSink::new().with_target(ConsoleTarget::Stderr);
    /// assert_eq!(sink.target(), ConsoleTarget::Stderr);
    /// ```
    #[must_use]
    pub fn with_target(mut self, target: ConsoleTarget) -> Self {
        self.target = target;
        self
    }

    /// Colour each line by level. Has no effect without the `console` feature.
    #[must_use]
    pub fn with_colors(mut self, use_colors: bool) -> Self {
        self.use_colors = use_colors;
        self
    }

    pub fn target(&self) -> ConsoleTarget {
        self.target
    }

    fn decorate<'a>(&self, level: LogLevel, line: &'a str) -> Cow<'a, str> {
        if !self.use_colors {
            return Cow::Borrowed(line);
        }
        colorize(level, line)
    }
}

impl Default for ConsoleSink {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "console")]
fn colorize(level: LogLevel, line: &str) -> Cow<'_, str> {
    use colored::Colorize;

    // Keep the line terminator outside the escape sequence
    let body = line.trim_end_matches(['\r', '\n']);
    let ending = &line[body.len()..];
    Cow::Owned(format!("{}{}", body.color(level.color_code()), ending))
}

#[cfg(not(feature = "console"))]
fn colorize(_level: LogLevel, line: &str) -> Cow<'_, str> {
    Cow::Borrowed(line)
}

impl Sink for ConsoleSink {
    fn write(&mut self, level: LogLevel, line: &str) -> Result<()> {
        let text = self.decorate(level, line);
        match self.target {
            ConsoleTarget::Stdout => std::io::stdout().lock().write_all(text.as_bytes())?,
            ConsoleTarget::Stderr => std::io::stderr().lock().write_all(text.as_bytes())?,
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        match self.target {
            ConsoleTarget::Stdout => std::io::stdout().flush()?,
            ConsoleTarget::Stderr => std::io::stderr().flush()?,
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "console"
    }
}
