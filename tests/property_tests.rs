//! Property-based tests for log_dispatch using proptest

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use log_dispatch::core::render_template;
use log_dispatch::prelude::*;
use parking_lot::Mutex;
use proptest::prelude::*;
use std::sync::Arc;
use tempfile::TempDir;

fn any_level() -> impl Strategy<Value = LogLevel> {
    prop_oneof![
        Just(LogLevel::Trace),
        Just(LogLevel::Debug),
        Just(LogLevel::Info),
        Just(LogLevel::Warn),
        Just(LogLevel::Error),
        Just(LogLevel::Fatal),
    ]
}

/// 2000-01-01 .. 2100-01-01 in milliseconds
fn any_timestamp() -> impl Strategy<Value = DateTime<Utc>> {
    (946_684_800_000i64..4_102_444_800_000i64)
        .prop_map(|ms| Utc.timestamp_millis_opt(ms).single().expect("in range"))
}

struct ParsedLine {
    timestamp: NaiveDateTime,
    thread: String,
    level: LogLevel,
    message: String,
}

/// Inverse of the default pattern
fn parse_default_line(line: &str) -> Option<ParsedLine> {
    let line = line.strip_suffix('\n')?;
    let line = line.strip_suffix('\r').unwrap_or(line);

    let timestamp = NaiveDateTime::parse_from_str(line.get(..23)?, "%Y-%m-%d %H:%M:%S%.3f").ok()?;
    let rest = line.get(23..)?.strip_prefix(" [")?;
    let close = rest.find("] ")?;
    let thread = rest[..close].to_string();
    let rest = &rest[close + 2..];

    let level = rest.get(..5)?.trim().parse().ok()?;
    let message = rest.get(5..)?.strip_prefix(" - ")?.to_string();

    Some(ParsedLine {
        timestamp,
        thread,
        level,
        message,
    })
}

// ============================================================================
// Formatter Tests
// ============================================================================

proptest! {
    /// Formatting with the default pattern and parsing back recovers the
    /// timestamp to the millisecond, the level and the message
    #[test]
    fn test_default_pattern_round_trip(
        timestamp in any_timestamp(),
        level in any_level(),
        message in "[a-zA-Z0-9 {},.!?%:-]{0,60}",
    ) {
        let record = LogRecord::new(level, "prop", message.clone(), Vec::new())
            .with_timestamp(timestamp);
        let line = PatternLayout::default().format(&record);

        let parsed = parse_default_line(&line).expect("line parses");
        let expected = timestamp.with_timezone(&Local).naive_local();

        prop_assert_eq!(parsed.timestamp, expected);
        prop_assert_eq!(parsed.level, level);
        prop_assert_eq!(parsed.message, message);
        prop_assert_eq!(parsed.thread, record.thread().to_string());
    }

    /// Control characters never split a record across lines
    #[test]
    fn test_formatted_record_is_one_line(message in "\\PC*[\n\r\t]\\PC*") {
        let record = LogRecord::new(LogLevel::Info, "prop", message, Vec::new());
        let line = PatternLayout::default().format(&record);
        let body = line.trim_end_matches(['\r', '\n']);
        prop_assert!(!body.contains(['\n', '\r']));
    }

    /// `{}` placeholders consume arguments in order
    #[test]
    fn test_template_substitutes_in_order(values in prop::collection::vec(any::<i64>(), 0..8)) {
        let template = vec!["{}"; values.len()].join("|");
        let args: Vec<ArgValue> = values.iter().copied().map(ArgValue::from).collect();
        let expected = values
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join("|");

        prop_assert_eq!(render_template(&template, &args), expected);
    }

    /// Placeholders without an argument stay verbatim
    #[test]
    fn test_template_missing_args_verbatim(extra in 1usize..5) {
        let template = vec!["{}"; extra].join(" ");
        prop_assert_eq!(render_template(&template, &[]), template);
    }
}

// ============================================================================
// LogLevel Tests
// ============================================================================

proptest! {
    #[test]
    fn test_log_level_str_roundtrip(level in any_level(), lower in any::<bool>()) {
        let text = if lower { level.to_str().to_lowercase() } else { level.to_str().to_string() };
        let parsed: LogLevel = text.parse().expect("level parses");
        prop_assert_eq!(parsed, level);
    }

    #[test]
    fn test_passes_matches_ordering(level in any_level(), threshold in any_level()) {
        prop_assert_eq!(level.passes(threshold), level >= threshold);
    }
}

// ============================================================================
// Threshold Tests
// ============================================================================

struct CountingSink {
    levels: Arc<Mutex<Vec<LogLevel>>>,
}

impl Sink for CountingSink {
    fn write(&mut self, level: LogLevel, _line: &str) -> Result<()> {
        self.levels.lock().push(level);
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &str {
        "counting"
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// No sink ever observes a record below the threshold
    #[test]
    fn test_sinks_never_see_filtered_levels(
        threshold in any_level(),
        levels in prop::collection::vec(any_level(), 0..50),
    ) {
        let settings = LogSettings {
            mode: DispatchMode::Sync,
            threshold,
            console: None,
            ..LogSettings::default()
        };
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = CountingSink { levels: Arc::clone(&seen) };
        let system = LogSystem::init_with(
            Configuration::from_settings(&settings).expect("valid"),
            vec![Box::new(sink)],
            DispatchHooks::default(),
        )
        .expect("init");
        let logger = system.logger("prop");

        for level in &levels {
            logger.log(*level, "x", Vec::new()).expect("emit");
        }

        let expected: Vec<LogLevel> = levels.iter().copied().filter(|l| *l >= threshold).collect();
        let filtered = levels.len() - expected.len();
        let observed = seen.lock().clone();
        prop_assert_eq!(observed, expected);
        prop_assert_eq!(system.metrics().filtered() as usize, filtered);
    }
}

// ============================================================================
// Rotation Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    /// The file set never exceeds the current file plus `max_backups`
    #[test]
    fn test_rotation_bounds_file_count(
        max_size in 64u64..512,
        max_backups in 1usize..6,
        line_count in 0usize..200,
    ) {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let path = temp_dir.path().join("prop.log");
        let policy = RollingFilePolicy::new(max_size, max_backups).expect("valid policy");
        let mut sink = RollingFileSink::new(&path, policy).expect("open");

        for i in 0..line_count {
            sink.write(LogLevel::Info, &format!("line {:05}\n", i)).expect("write");
        }
        sink.flush().expect("flush");

        let files: Vec<_> = std::fs::read_dir(temp_dir.path())
            .expect("read dir")
            .filter_map(|e| e.ok())
            .collect();
        prop_assert!(files.len() <= max_backups + 1);
        for entry in files {
            prop_assert!(entry.metadata().expect("metadata").len() <= max_size);
        }
    }
}
