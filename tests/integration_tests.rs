//! Integration tests for the logging system
//!
//! These tests verify:
//! - Threshold filtering before dispatch
//! - Ordering and drain guarantees per mode
//! - Sink error propagation and error callbacks
//! - Rolling-file rotation through a full system
//! - Configuration validation and log injection prevention

use log_dispatch::core::{RollingFileSettings, SinkConfig};
use log_dispatch::prelude::*;
use log_dispatch::{debug, info};
use parking_lot::Mutex;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

const DRAIN: Duration = Duration::from_secs(5);

/// Sink that keeps every line in memory
struct MemorySink {
    lines: Arc<Mutex<Vec<String>>>,
}

impl Sink for MemorySink {
    fn write(&mut self, _level: LogLevel, line: &str) -> Result<()> {
        self.lines.lock().push(line.to_string());
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

struct BrokenSink;

impl Sink for BrokenSink {
    fn write(&mut self, _level: LogLevel, _line: &str) -> Result<()> {
        Err(LoggerError::writer("device unavailable"))
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &str {
        "broken"
    }
}

fn settings(mode: DispatchMode, threshold: LogLevel) -> LogSettings {
    LogSettings {
        mode,
        threshold,
        pattern: "%m".to_string(),
        console: None,
        queue_capacity: 2048,
        ..LogSettings::default()
    }
}

fn memory_system(settings: &LogSettings) -> (LogSystem, Arc<Mutex<Vec<String>>>) {
    let lines = Arc::new(Mutex::new(Vec::new()));
    let sink = MemorySink {
        lines: Arc::clone(&lines),
    };
    let config = Configuration::from_settings(settings).expect("valid settings");
    let system = LogSystem::init_with(config, vec![Box::new(sink)], DispatchHooks::default())
        .expect("Failed to init logging");
    (system, lines)
}

fn rolling_settings(path: &Path, mode: DispatchMode) -> LogSettings {
    LogSettings {
        mode,
        threshold: LogLevel::Debug,
        console: None,
        rolling_file: Some(RollingFileSettings {
            path: path.to_path_buf(),
            max_size: "1 K".to_string(),
            max_backups: 5,
            compress: false,
        }),
        ..LogSettings::default()
    }
}

#[test]
fn test_below_threshold_never_reaches_sinks() {
    for mode in DispatchMode::ALL {
        let (system, lines) = memory_system(&settings(mode, LogLevel::Info));
        let logger = system.logger("filter");

        for i in 0..1000 {
            debug!(logger, "Loop iteration {}", i).expect("emit");
        }
        let report = system.drain(DRAIN);

        assert!(!report.timed_out);
        assert!(lines.lock().is_empty(), "{} wrote filtered records", mode);
        assert_eq!(system.metrics().filtered(), 1000);
        assert_eq!(system.metrics().accepted(), 0);
    }
}

#[test]
fn test_thousand_records_written_in_order() {
    for mode in [DispatchMode::Sync, DispatchMode::AsyncLocking] {
        let (system, lines) = memory_system(&settings(mode, LogLevel::Debug));
        let logger = system.logger("order");

        for i in 0..1000 {
            info!(logger, "record {}", i).expect("emit");
        }
        let report = system.drain(DRAIN);
        assert!(report.is_lossless());

        let lines = lines.lock();
        assert_eq!(lines.len(), 1000, "{}", mode);
        for (i, line) in lines.iter().enumerate() {
            assert_eq!(line, &format!("record {}", i), "{}", mode);
        }
    }
}

#[test]
fn test_nonlocking_drain_accounts_for_every_emit() {
    let mut settings = settings(DispatchMode::AsyncNonlocking, LogLevel::Debug);
    settings.queue_capacity = 64;
    let (system, lines) = memory_system(&settings);
    let logger = system.logger("lossy");

    for i in 0..1000 {
        info!(logger, "record {}", i).expect("emit never fails while running");
    }
    let report = system.drain(DRAIN);

    assert!(!report.timed_out);
    assert_eq!(report.processed + report.dropped, 1000);
    assert_eq!(lines.lock().len() as u64, report.processed);
    assert_eq!(system.metrics().pending(), 0);
}

#[test]
fn test_sync_sink_failure_reaches_caller() {
    let config = Configuration::from_settings(&settings(DispatchMode::Sync, LogLevel::Info))
        .expect("valid settings");
    let system = LogSystem::init_with(config, vec![Box::new(BrokenSink)], DispatchHooks::default())
        .expect("init");

    let result = system.logger("sync").info("hello");
    assert!(matches!(result, Err(LoggerError::WriterError(_))));
    assert_eq!(system.metrics().write_errors(), 1);
}

#[test]
fn test_async_sink_failure_goes_to_callback() {
    for mode in [DispatchMode::AsyncLocking, DispatchMode::AsyncNonlocking] {
        let seen = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&seen);
        let hooks = DispatchHooks {
            on_overflow: None,
            on_error: Some(Arc::new(move |_err: &LoggerError| {
                counter.fetch_add(1, Ordering::SeqCst);
            })),
        };
        let config = Configuration::from_settings(&settings(mode, LogLevel::Info))
            .expect("valid settings");
        let system = LogSystem::init_with(config, vec![Box::new(BrokenSink)], hooks).expect("init");
        let logger = system.logger("async");

        for i in 0..5 {
            // Never raised on the producer thread
            assert!(info!(logger, "attempt {}", i).is_ok());
        }
        system.drain(DRAIN);

        assert_eq!(system.metrics().write_errors(), 5, "{}", mode);
        assert_eq!(seen.load(Ordering::SeqCst), 5, "{}", mode);
    }
}

#[test]
fn test_default_pattern_in_rolling_file() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let log_file = temp_dir.path().join("LogTest.log");

    let config = Configuration::from_settings(&rolling_settings(&log_file, DispatchMode::AsyncLocking))
        .expect("valid settings");
    let system = LogSystem::init(config).expect("init");

    let worker = std::thread::Builder::new()
        .name("producer-1".to_string())
        .spawn({
            let logger = system.logger("LogTest");
            move || info!(logger, "started, mode = {}", "AsyncLocking").expect("emit")
        })
        .expect("spawn");
    worker.join().expect("join");
    system.shutdown(DRAIN);

    let content = fs::read_to_string(&log_file).expect("Failed to read log file");
    let line = content.lines().next().expect("one line");

    // "YYYY-MM-DD HH:mm:ss.SSS [thread] LEVEL - message"
    assert_eq!(&line[4..5], "-");
    assert_eq!(&line[10..11], " ");
    assert_eq!(&line[19..20], ".");
    assert!(line[20..23].chars().all(|c| c.is_ascii_digit()));
    assert!(line[23..].starts_with(" [producer-1] INFO  - started, mode = AsyncLocking"));
}

#[test]
fn test_rotation_through_system_keeps_six_files() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let log_file = temp_dir.path().join("LogTest.log");

    let config = Configuration::from_settings(&rolling_settings(&log_file, DispatchMode::Sync))
        .expect("valid settings");
    let system = LogSystem::init(config).expect("init");
    let logger = system.logger("rotation");

    for i in 0..500 {
        info!(logger, "Loop iteration {} with some padding to fill the file", i).expect("emit");
    }
    system.shutdown(DRAIN);

    let files: Vec<_> = fs::read_dir(temp_dir.path())
        .expect("read dir")
        .filter_map(|e| e.ok())
        .collect();
    assert_eq!(files.len(), 6, "current file plus five backups");

    for entry in &files {
        let size = entry.metadata().expect("metadata").len();
        assert!(size <= 1024, "{:?} is {} bytes", entry.path(), size);
    }

    // The newest record is in the current file; the oldest is gone
    let current = fs::read_to_string(&log_file).expect("read current");
    assert!(current.contains("Loop iteration 499 "));
    let all: String = files
        .iter()
        .map(|e| fs::read_to_string(e.path()).expect("read segment"))
        .collect();
    assert!(!all.contains("Loop iteration 0 "));
}

#[test]
fn test_log_injection_prevention() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let log_file = temp_dir.path().join("injection_test.log");

    let config = Configuration::from_settings(&rolling_settings(&log_file, DispatchMode::Sync))
        .expect("valid settings");
    let system = LogSystem::init(config).expect("init");

    let malicious = "User login\nERROR [2024-10-17] Fake error injected\nINFO Continuation";
    info!(system.logger("auth"), "{}", malicious).expect("emit");
    system.shutdown(DRAIN);

    let content = fs::read_to_string(&log_file).expect("Failed to read log file");
    assert!(content.contains("\\n"));
    assert_eq!(content.lines().count(), 1, "Log should be a single line");
}

#[test]
fn test_invalid_settings_are_fatal() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let mut bad = rolling_settings(&temp_dir.path().join("x.log"), DispatchMode::Sync);
    if let Some(ref mut file) = bad.rolling_file {
        file.max_backups = 0;
    }
    let err = Configuration::from_settings(&bad).expect_err("zero backups rejected");
    assert!(err.is_configuration());

    let lossy_block = LogSettings {
        mode: DispatchMode::AsyncNonlocking,
        overflow_policy: Some(OverflowPolicy::DropOldest),
        ..LogSettings::default()
    };
    assert!(Configuration::from_settings(&lossy_block).is_err());
}

#[cfg(feature = "file")]
#[test]
fn test_second_system_on_same_file_fails() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let log_file = temp_dir.path().join("shared.log");
    let settings = rolling_settings(&log_file, DispatchMode::Sync);

    let first = LogSystem::init(Configuration::from_settings(&settings).expect("valid"))
        .expect("first init");
    let second = LogSystem::init(Configuration::from_settings(&settings).expect("valid"));
    assert!(second.is_err());

    drop(first);
}

#[test]
fn test_handles_fail_after_shutdown() {
    for mode in DispatchMode::ALL {
        let (system, lines) = memory_system(&settings(mode, LogLevel::Info));
        let logger = system.logger("late");

        logger.info("before").expect("emit");
        let report = system.shutdown(DRAIN);

        assert_eq!(report.processed, 1, "{}", mode);
        assert_eq!(lines.lock().len(), 1);
        assert!(matches!(logger.info("after"), Err(LoggerError::LoggerStopped)));
    }
}

#[test]
fn test_settings_file_drives_system() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let log_file = temp_dir.path().join("from_json.log");
    let settings_file = temp_dir.path().join("logging.json");

    let json = format!(
        r#"{{
            "mode": "async_nonlocking",
            "threshold": "WARN",
            "pattern": "%-5p %c - %m%n",
            "console": null,
            "rolling_file": {{ "path": {:?}, "max_size": "4 KB", "max_backups": 2 }}
        }}"#,
        log_file.to_str().expect("utf-8 path")
    );
    fs::write(&settings_file, json).expect("write settings");

    let settings = LogSettings::from_file(&settings_file).expect("parse settings");
    let config = Configuration::from_settings(&settings).expect("valid settings");
    assert_eq!(config.overflow_policy(), OverflowPolicy::DropNewest);
    assert!(matches!(config.sinks()[0], SinkConfig::RollingFile { .. }));

    let system = LogSystem::init(config).expect("init");
    let logger = system.logger("json");
    logger.info("ignored").expect("emit");
    logger.error("kept").expect("emit");
    system.shutdown(DRAIN);

    let content = fs::read_to_string(&log_file).expect("read log");
    assert_eq!(content.lines().collect::<Vec<_>>(), vec!["ERROR json - kept"]);
}
