//! Pattern layout: renders a [`LogRecord`] as a line of text
//!
//! Patterns follow the log4j conversion syntax. Supported conversions:
//!
//! | conversion                  | output                                   |
//! |-----------------------------|------------------------------------------|
//! | `%d{pattern}`, `%date`      | timestamp, see [`DatePattern`]           |
//! | `%t`, `%thread`             | thread name, or thread id when unnamed   |
//! | `%p`, `%level`              | level name                               |
//! | `%c`, `%logger`             | logger name                              |
//! | `%m`, `%msg`, `%message`    | message with arguments substituted       |
//! | `%n`                        | line separator                           |
//! | `%%`                        | a literal `%`                            |
//!
//! Each conversion accepts a format modifier between `%` and its name:
//! `-` left-aligns, a number sets the minimum width, `.N` keeps at most the
//! last `N` characters.

use super::error::{LoggerError, Result};
use super::record::LogRecord;
use super::timestamp::DatePattern;
use std::borrow::Cow;

/// Pattern used when the configuration does not name one
pub const DEFAULT_PATTERN: &str = "%d{yyyy-MM-dd HH:mm:ss.SSS} [%t] %-5level - %m%n";

pub const LINE_SEPARATOR: &str = if cfg!(windows) { "\r\n" } else { "\n" };

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Literal(String),
    Date(DatePattern),
    Thread,
    Level,
    Logger,
    Message,
    Newline,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Modifier {
    left_align: bool,
    min_width: usize,
    max_width: Option<usize>,
}

impl Modifier {
    fn apply<'a>(&self, value: Cow<'a, str>) -> Cow<'a, str> {
        let mut value = value;

        if let Some(max) = self.max_width {
            let len = value.chars().count();
            if len > max {
                value = Cow::Owned(value.chars().skip(len - max).collect());
            }
        }

        let len = value.chars().count();
        if len >= self.min_width {
            return value;
        }

        let padding = " ".repeat(self.min_width - len);
        if self.left_align {
            Cow::Owned(format!("{}{}", value, padding))
        } else {
            Cow::Owned(format!("{}{}", padding, value))
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Element {
    segment: Segment,
    modifier: Modifier,
}

/// Compiled pattern
///
/// # Example
///
/// ```
/// use log_dispatch::core::{LogLevel, LogRecord, PatternLayout};
///
/// let layout = PatternLayout::parse("%-5level %c - %m").unwrap();
/// let record = LogRecord::new(LogLevel::Warn, "db", "retry {} of {}", vec![1.into(), 3.into()]);
/// assert_eq!(layout.format(&record), "WARN  db - retry 1 of 3");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct PatternLayout {
    pattern: String,
    elements: Vec<Element>,
}

impl PatternLayout {
    /// Compile a pattern
    ///
    /// # Errors
    ///
    /// Returns a formatter error for unknown conversions, a dangling `%`,
    /// an unterminated `{` option, an invalid date pattern or a width too
    /// large for `usize`.
    pub fn parse(pattern: &str) -> Result<Self> {
        let chars: Vec<char> = pattern.chars().collect();
        let mut elements: Vec<Element> = Vec::new();
        let mut literal = String::new();
        let mut i = 0;

        while i < chars.len() {
            if chars[i] != '%' {
                literal.push(chars[i]);
                i += 1;
                continue;
            }
            i += 1;

            match chars.get(i) {
                None => {
                    return Err(pattern_error(pattern, "dangling '%' at end of pattern"));
                }
                Some('%') => {
                    literal.push('%');
                    i += 1;
                    continue;
                }
                Some(_) => {}
            }

            let mut modifier = Modifier::default();
            if chars.get(i) == Some(&'-') {
                modifier.left_align = true;
                i += 1;
            }
            let (min, next) = read_number(pattern, &chars, i)?;
            modifier.min_width = min.unwrap_or(0);
            i = next;
            if chars.get(i) == Some(&'.') {
                let (max, next) = read_number(pattern, &chars, i + 1)?;
                modifier.max_width = Some(max.ok_or_else(|| {
                    pattern_error(pattern, "'.' must be followed by a maximum width")
                })?);
                i = next;
            }

            let start = i;
            while i < chars.len() && chars[i].is_ascii_alphabetic() {
                i += 1;
            }
            let name: String = chars[start..i].iter().collect();

            let mut option = None;
            if chars.get(i) == Some(&'{') {
                let close = chars[i + 1..]
                    .iter()
                    .position(|&c| c == '}')
                    .ok_or_else(|| pattern_error(pattern, "unterminated '{' option"))?;
                option = Some(chars[i + 1..i + 1 + close].iter().collect::<String>());
                i += close + 2;
            }

            let segment = match name.as_str() {
                "d" | "date" => Segment::Date(DatePattern::parse(option.as_deref().unwrap_or(""))?),
                "t" | "thread" | "tn" | "threadName" => Segment::Thread,
                "p" | "level" => Segment::Level,
                "c" | "logger" => Segment::Logger,
                "m" | "msg" | "message" => Segment::Message,
                "n" => Segment::Newline,
                "" => return Err(pattern_error(pattern, "missing conversion name after '%'")),
                other => {
                    return Err(pattern_error(
                        pattern,
                        format!("unknown conversion '%{}'", other),
                    ))
                }
            };

            if !literal.is_empty() {
                elements.push(Element {
                    segment: Segment::Literal(std::mem::take(&mut literal)),
                    modifier: Modifier::default(),
                });
            }
            elements.push(Element { segment, modifier });
        }

        if !literal.is_empty() {
            elements.push(Element {
                segment: Segment::Literal(literal),
                modifier: Modifier::default(),
            });
        }

        Ok(Self {
            pattern: pattern.to_string(),
            elements,
        })
    }

    /// The source pattern
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Render a record. Pure: the output depends only on the record and the
    /// local time zone.
    #[must_use]
    pub fn format(&self, record: &LogRecord) -> String {
        let mut out = String::with_capacity(128);

        for element in &self.elements {
            let value: Cow<'_, str> = match &element.segment {
                Segment::Literal(text) => {
                    out.push_str(text);
                    continue;
                }
                Segment::Newline => {
                    out.push_str(LINE_SEPARATOR);
                    continue;
                }
                Segment::Date(date) => Cow::Owned(date.format(&record.timestamp())),
                Segment::Thread => Cow::Borrowed(record.thread()),
                Segment::Level => Cow::Borrowed(record.level().to_str()),
                Segment::Logger => Cow::Borrowed(record.logger_name()),
                Segment::Message => Cow::Owned(record.message()),
            };
            out.push_str(&element.modifier.apply(value));
        }

        out
    }
}

impl Default for PatternLayout {
    fn default() -> Self {
        // test_default_pattern parses DEFAULT_PATTERN
        Self::parse(DEFAULT_PATTERN).expect("DEFAULT_PATTERN is a valid pattern")
    }
}

/// Format one record with a pattern compiled on the spot
///
/// # Errors
///
/// Returns a formatter error when the pattern does not compile.
pub fn format(record: &LogRecord, pattern: &str) -> Result<String> {
    Ok(PatternLayout::parse(pattern)?.format(record))
}

/// Read a run of digits. `None` means there were no digits at `start`.
fn read_number(pattern: &str, chars: &[char], start: usize) -> Result<(Option<usize>, usize)> {
    let mut end = start;
    while end < chars.len() && chars[end].is_ascii_digit() {
        end += 1;
    }
    if end == start {
        return Ok((None, start));
    }
    let digits: String = chars[start..end].iter().collect();
    let value = digits
        .parse::<usize>()
        .map_err(|_| pattern_error(pattern, format!("width modifier '{}' is too large", digits)))?;
    Ok((Some(value), end))
}

fn pattern_error(pattern: &str, message: impl Into<String>) -> LoggerError {
    LoggerError::formatter("pattern", format!("{} in '{}'", message.into(), pattern))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::log_level::LogLevel;
    use chrono::{Local, TimeZone};

    fn record(level: LogLevel, template: &str) -> LogRecord {
        let ts = Local
            .with_ymd_and_hms(2025, 3, 14, 15, 9, 26)
            .single()
            .expect("unambiguous local time")
            + chrono::Duration::milliseconds(535);
        LogRecord::new(level, "app::db", template, vec![42.into()])
            .with_timestamp(ts.with_timezone(&chrono::Utc))
    }

    #[test]
    fn test_default_pattern() {
        let layout = PatternLayout::default();
        assert_eq!(layout.pattern(), DEFAULT_PATTERN);

        let line = layout.format(&record(LogLevel::Info, "answer {}"));
        let expected_thread = record(LogLevel::Info, "").thread().to_string();
        assert_eq!(
            line,
            format!(
                "2025-03-14 15:09:26.535 [{}] INFO  - answer 42{}",
                expected_thread, LINE_SEPARATOR
            )
        );
    }

    #[test]
    fn test_level_is_fixed_width() {
        let layout = PatternLayout::parse("%-5level|").unwrap();
        assert_eq!(layout.format(&record(LogLevel::Warn, "")), "WARN |");
        assert_eq!(layout.format(&record(LogLevel::Error, "")), "ERROR|");

        let right = PatternLayout::parse("%6p|").unwrap();
        assert_eq!(right.format(&record(LogLevel::Info, "")), "  INFO|");
    }

    #[test]
    fn test_max_width_truncates_from_left() {
        let layout = PatternLayout::parse("%.2c").unwrap();
        assert_eq!(layout.format(&record(LogLevel::Info, "")), "db");
    }

    #[test]
    fn test_percent_escape_and_literals() {
        let layout = PatternLayout::parse("100%% [%logger] %msg").unwrap();
        assert_eq!(
            layout.format(&record(LogLevel::Info, "x={}")),
            "100% [app::db] x=42"
        );
    }

    #[test]
    fn test_invalid_patterns() {
        assert!(PatternLayout::parse("%q").is_err());
        assert!(PatternLayout::parse("trailing %").is_err());
        assert!(PatternLayout::parse("%d{yyyy").is_err());
        assert!(PatternLayout::parse("%d{QQ}").is_err());
        assert!(PatternLayout::parse("%-.p").is_err());
        assert!(PatternLayout::parse("%-").is_err());
    }

    #[test]
    fn test_oversized_width_is_rejected() {
        let err = PatternLayout::parse("%99999999999999999999p").unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("too large"), "{}", err);
        assert!(PatternLayout::parse("%.99999999999999999999m").is_err());

        // Widths that fit are still honoured
        let layout = PatternLayout::parse("[%8p]").unwrap();
        assert_eq!(layout.format(&record(LogLevel::Warn, "")), "[    WARN]");
    }

    #[test]
    fn test_free_format_function() {
        let line = format(&record(LogLevel::Fatal, "down"), "%p:%m").unwrap();
        assert_eq!(line, "FATAL:down");
        assert!(format(&record(LogLevel::Fatal, "down"), "%zz").is_err());
    }
}
