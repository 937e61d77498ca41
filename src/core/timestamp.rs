//! Timestamp formatting for `%d{...}` conversions
//!
//! Date patterns use the Java `SimpleDateFormat` letters familiar from log4j
//! layouts (`yyyy-MM-dd HH:mm:ss.SSS`). They are compiled once into a chrono
//! strftime string and rendered in the local time zone.

use super::error::{LoggerError, Result};
use chrono::{DateTime, Local, TimeZone, Utc};
use std::fmt;

/// log4j's default `%d` pattern
pub const DEFAULT_DATE_PATTERN: &str = "yyyy-MM-dd HH:mm:ss,SSS";

/// Compiled date pattern
///
/// # Examples
///
/// ```
/// use log_dispatch::core::DatePattern;
/// use chrono::{TimeZone, Utc};
///
/// let pattern = DatePattern::parse("yyyy-MM-dd HH:mm:ss.SSS").unwrap();
/// assert_eq!(pattern.strftime(), "%Y-%m-%d %H:%M:%S.%3f");
///
/// let ts = Utc.with_ymd_and_hms(2025, 1, 8, 10, 30, 45).unwrap();
/// assert_eq!(pattern.format_in(&ts), "2025-01-08 10:30:45.000");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatePattern {
    source: String,
    strftime: String,
}

impl DatePattern {
    /// Compile a Java-style date pattern or one of the named formats
    /// `DEFAULT`, `ISO8601`, `ABSOLUTE`, `DATE`.
    ///
    /// # Errors
    ///
    /// Returns a formatter error for unknown pattern letters, unterminated
    /// quotes or unsupported fraction widths.
    pub fn parse(pattern: &str) -> Result<Self> {
        let expanded = match pattern {
            "" | "DEFAULT" => DEFAULT_DATE_PATTERN,
            "ISO8601" => "yyyy-MM-dd'T'HH:mm:ss,SSS",
            "ABSOLUTE" => "HH:mm:ss,SSS",
            "DATE" => "dd MMM yyyy HH:mm:ss,SSS",
            other => other,
        };

        Ok(Self {
            source: pattern.to_string(),
            strftime: to_strftime(expanded)?,
        })
    }

    /// Pattern as written in the configuration
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Equivalent chrono format string
    pub fn strftime(&self) -> &str {
        &self.strftime
    }

    /// Render a UTC instant in the local time zone
    #[must_use]
    pub fn format(&self, timestamp: &DateTime<Utc>) -> String {
        self.format_in(&timestamp.with_timezone(&Local))
    }

    /// Render an instant in the zone it carries
    #[must_use]
    pub fn format_in<Tz: TimeZone>(&self, timestamp: &DateTime<Tz>) -> String
    where
        Tz::Offset: fmt::Display,
    {
        timestamp.format(&self.strftime).to_string()
    }
}

impl Default for DatePattern {
    fn default() -> Self {
        Self {
            source: DEFAULT_DATE_PATTERN.to_string(),
            strftime: "%Y-%m-%d %H:%M:%S,%3f".to_string(),
        }
    }
}

fn to_strftime(pattern: &str) -> Result<String> {
    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::with_capacity(pattern.len() * 2);
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if c == '\'' {
            // '' is a literal quote, otherwise copy until the closing quote
            if chars.get(i + 1) == Some(&'\'') {
                out.push('\'');
                i += 2;
                continue;
            }
            let close = chars[i + 1..]
                .iter()
                .position(|&q| q == '\'')
                .ok_or_else(|| {
                    LoggerError::formatter("date", format!("unterminated quote in '{}'", pattern))
                })?;
            for &lit in &chars[i + 1..i + 1 + close] {
                push_literal(&mut out, lit);
            }
            i += close + 2;
            continue;
        }

        if !c.is_ascii_alphabetic() {
            push_literal(&mut out, c);
            i += 1;
            continue;
        }

        let run = chars[i..].iter().take_while(|&&n| n == c).count();
        let spec = match (c, run) {
            ('y', 2) => "%y",
            ('y', _) => "%Y",
            ('M', 1) => "%-m",
            ('M', 2) => "%m",
            ('M', 3) => "%b",
            ('M', _) => "%B",
            ('d', 1) => "%-d",
            ('d', _) => "%d",
            ('H', 1) => "%-H",
            ('H', _) => "%H",
            ('h', 1) => "%-I",
            ('h', _) => "%I",
            ('m', 1) => "%-M",
            ('m', _) => "%M",
            ('s', 1) => "%-S",
            ('s', _) => "%S",
            ('S', 1..=3) => "%3f",
            ('S', 4..=6) => "%6f",
            ('S', 7..=9) => "%9f",
            ('a', _) => "%p",
            ('E', 1..=3) => "%a",
            ('E', _) => "%A",
            ('Z', _) => "%z",
            ('X', _) => "%:z",
            ('z', _) => "%Z",
            _ => {
                return Err(LoggerError::formatter(
                    "date",
                    format!("unsupported pattern letters '{}' in '{}'", c.to_string().repeat(run), pattern),
                ))
            }
        };
        out.push_str(spec);
        i += run;
    }

    Ok(out)
}

fn push_literal(out: &mut String, c: char) {
    if c == '%' {
        out.push_str("%%");
    } else {
        out.push(c);
    }
}
