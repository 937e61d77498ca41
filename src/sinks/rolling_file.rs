//! Size-bounded rolling file sink
//!
//! The current file is `<name>`; archived segments are `<name>.1` (newest)
//! through `<name>.<max_backup_count>` (oldest), or `<name>.<i>.gz` when
//! compression is enabled. Rotation happens before a write that would push a
//! non-empty file past `max_size_bytes`.

use crate::core::{LogLevel, LoggerError, Result, Sink};
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Parse a log4j-style size such as `"1 K"`, `"10 MB"` or `"512"`.
///
/// Units are binary (`K` = 1024) and case-insensitive.
///
/// # Example
///
/// ```
/// use log_dispatch::sinks::parse_byte_size;
///
/// assert_eq!(parse_byte_size("1 K").unwrap(), 1024);
/// assert_eq!(parse_byte_size("2.5MB").unwrap(), 2_621_440);
/// assert!(parse_byte_size("ten").is_err());
/// ```
pub fn parse_byte_size(text: &str) -> Result<u64> {
    let trimmed = text.trim();
    let split = trimmed
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(trimmed.len());
    let (number, unit) = trimmed.split_at(split);

    let value: f64 = number
        .parse()
        .map_err(|_| LoggerError::config("RollingFile", format!("invalid size '{}'", text)))?;

    let multiplier: u64 = match unit.trim().to_uppercase().as_str() {
        "" | "B" | "BYTES" => 1,
        "K" | "KB" | "KIB" => 1024,
        "M" | "MB" | "MIB" => 1024 * 1024,
        "G" | "GB" | "GIB" => 1024 * 1024 * 1024,
        other => {
            return Err(LoggerError::config(
                "RollingFile",
                format!("unknown size unit '{}' in '{}'", other, text),
            ))
        }
    };

    Ok((value * multiplier as f64) as u64)
}

/// Largest accepted `max_backup_count`
pub const MAX_BACKUP_COUNT: usize = 1000;

/// Bounds for a rolling file
///
/// # Examples
///
/// ```
/// use log_dispatch::sinks::RollingFilePolicy;
///
/// let policy = RollingFilePolicy::new(1024, 5).unwrap();
/// assert_eq!(policy.max_size_bytes(), 1024);
/// assert_eq!(policy.max_backup_count(), 5);
///
/// assert!(RollingFilePolicy::new(0, 5).is_err());
/// assert!(RollingFilePolicy::new(1024, 0).is_err());
/// assert!(RollingFilePolicy::new(1024, 1001).is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RollingFilePolicy {
    max_size_bytes: u64,
    max_backup_count: usize,
    compress: bool,
}

impl RollingFilePolicy {
    /// # Errors
    ///
    /// Both bounds must be positive, and `max_backup_count` may not exceed
    /// [`MAX_BACKUP_COUNT`].
    pub fn new(max_size_bytes: u64, max_backup_count: usize) -> Result<Self> {
        if max_size_bytes == 0 {
            return Err(LoggerError::config(
                "RollingFile",
                "max_size_bytes must be a positive integer",
            ));
        }
        if max_backup_count == 0 {
            return Err(LoggerError::config(
                "RollingFile",
                "max_backup_count must be a positive integer",
            ));
        }
        if max_backup_count > MAX_BACKUP_COUNT {
            return Err(LoggerError::config(
                "RollingFile",
                format!(
                    "max_backup_count {} exceeds the limit of {}",
                    max_backup_count, MAX_BACKUP_COUNT
                ),
            ));
        }
        Ok(Self {
            max_size_bytes,
            max_backup_count,
            compress: false,
        })
    }

    /// Gzip segments as they are archived
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_compression(mut self, enabled: bool) -> Self {
        self.compress = enabled;
        self
    }

    pub fn max_size_bytes(&self) -> u64 {
        self.max_size_bytes
    }

    pub fn max_backup_count(&self) -> usize {
        self.max_backup_count
    }

    pub fn compress(&self) -> bool {
        self.compress
    }
}

/// Rolling file sink
///
/// # Example
///
/// ```no_run
/// use log_dispatch::sinks::{RollingFilePolicy, RollingFileSink};
///
/// let policy = RollingFilePolicy::new(1024, 5).unwrap();
/// let sink = RollingFileSink::new("LogTest.log", policy).unwrap();
/// ```
pub struct RollingFileSink {
    base_path: PathBuf,
    policy: RollingFilePolicy,
    writer: Option<BufWriter<File>>,
    current_size: u64,
}

impl RollingFileSink {
    /// Open (or create) the current file in append mode
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or file cannot be created, or, with
    /// the `file` feature, if another sink already holds the file.
    pub fn new<P: AsRef<Path>>(path: P, policy: RollingFilePolicy) -> Result<Self> {
        let base_path = path.as_ref().to_path_buf();

        if let Some(parent) = base_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                LoggerError::io_operation(
                    "create log directory",
                    format!("Failed to create directory '{}'", parent.display()),
                    e,
                )
            })?;
        }

        let (file, current_size) = Self::open_current(&base_path)?;

        Ok(Self {
            base_path,
            policy,
            writer: Some(BufWriter::new(file)),
            current_size,
        })
    }

    fn open_current(path: &Path) -> Result<(File, u64)> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| {
                LoggerError::file_appender(path.display().to_string(), format!("Failed to open: {}", e))
            })?;

        #[cfg(feature = "file")]
        {
            use fs2::FileExt;
            file.try_lock_exclusive()
                .map_err(|_| LoggerError::file_lock(path.display().to_string()))?;
        }

        let size = file
            .metadata()
            .map_err(|e| {
                LoggerError::file_appender(
                    path.display().to_string(),
                    format!("Cannot access file metadata: {}", e),
                )
            })?
            .len();

        Ok((file, size))
    }

    fn should_rotate(&self, incoming: u64) -> bool {
        self.current_size > 0 && self.current_size + incoming > self.policy.max_size_bytes
    }

    fn rotate(&mut self) -> Result<()> {
        // Release the handle (and its lock) before renaming
        if let Some(mut writer) = self.writer.take() {
            writer.flush().map_err(|e| {
                LoggerError::file_rotation(
                    self.base_path.display().to_string(),
                    format!("Failed to flush before rotation: {}", e),
                )
            })?;
        }

        let max = self.policy.max_backup_count;
        for oldest in [self.backup_path(max), self.compressed_path(max)] {
            if oldest.exists() {
                fs::remove_file(&oldest).map_err(|e| {
                    LoggerError::file_rotation(
                        oldest.display().to_string(),
                        format!("Failed to remove oldest segment: {}", e),
                    )
                })?;
            }
        }

        // Only indices that exist on disk need to move
        let top = self.highest_backup_index().min(max - 1);
        for i in (1..=top).rev() {
            let moves = [
                (self.backup_path(i), self.backup_path(i + 1)),
                (self.compressed_path(i), self.compressed_path(i + 1)),
            ];
            for (from, to) in moves {
                if from.exists() {
                    fs::rename(&from, &to).map_err(|e| {
                        LoggerError::file_rotation(
                            from.display().to_string(),
                            format!("Failed to shift segment: {}", e),
                        )
                    })?;
                }
            }
        }

        if self.base_path.exists() {
            let first = self.backup_path(1);
            fs::rename(&self.base_path, &first).map_err(|e| {
                LoggerError::file_rotation(
                    self.base_path.display().to_string(),
                    format!("Failed to archive current log file: {}", e),
                )
            })?;

            if self.policy.compress {
                compress_file(&first, &self.compressed_path(1))?;
            }
        }

        let (file, size) = Self::open_current(&self.base_path)?;
        self.writer = Some(BufWriter::new(file));
        self.current_size = size;

        Ok(())
    }

    /// Highest `<name>.<i>` or `<name>.<i>.gz` index next to the current file.
    /// An unreadable directory reports `usize::MAX` so every slot is visited.
    fn highest_backup_index(&self) -> usize {
        let prefix = format!("{}.", self.file_name());
        let dir = match self.base_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            Some(parent) => parent,
            None => Path::new("."),
        };

        let Ok(entries) = fs::read_dir(dir) else {
            return usize::MAX;
        };
        entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                let name = entry.file_name().into_string().ok()?;
                let suffix = name.strip_prefix(&prefix)?;
                let index = suffix.strip_suffix(".gz").unwrap_or(suffix);
                index.parse::<usize>().ok()
            })
            .max()
            .unwrap_or(0)
    }

    fn backup_path(&self, index: usize) -> PathBuf {
        self.sibling(format!("{}", index))
    }

    fn compressed_path(&self, index: usize) -> PathBuf {
        self.sibling(format!("{}.gz", index))
    }

    fn sibling(&self, suffix: String) -> PathBuf {
        self.base_path
            .with_file_name(format!("{}.{}", self.file_name(), suffix))
    }

    fn file_name(&self) -> &str {
        self.base_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("app.log")
    }

    /// Bytes written to the current file
    #[must_use]
    pub fn current_size(&self) -> u64 {
        self.current_size
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.base_path
    }

    #[must_use]
    pub fn policy(&self) -> &RollingFilePolicy {
        &self.policy
    }
}

/// Gzip `path` into `gz_path`, removing the original only after success
fn compress_file(path: &Path, gz_path: &Path) -> Result<()> {
    let temp_path = gz_path.with_extension("gz.tmp");

    let result = (|| -> std::io::Result<()> {
        let mut reader = BufReader::with_capacity(64 * 1024, File::open(path)?);
        let output = BufWriter::with_capacity(64 * 1024, File::create(&temp_path)?);
        let mut encoder = flate2::write::GzEncoder::new(output, flate2::Compression::default());
        std::io::copy(&mut reader, &mut encoder)?;
        encoder.finish()?.flush()?;
        fs::rename(&temp_path, gz_path)
    })();

    if let Err(e) = result {
        let _ = fs::remove_file(&temp_path);
        return Err(LoggerError::io_operation(
            "compress log segment",
            format!("Failed to compress '{}'", path.display()),
            e,
        ));
    }

    if let Err(e) = fs::remove_file(path) {
        eprintln!(
            "[LOGGER WARNING] Compressed {} but could not remove the original: {}",
            path.display(),
            e
        );
    }
    Ok(())
}

impl Sink for RollingFileSink {
    fn write(&mut self, _level: LogLevel, line: &str) -> Result<()> {
        let incoming = line.len() as u64;

        if self.should_rotate(incoming) {
            if let Err(e) = self.rotate() {
                eprintln!(
                    "[LOGGER WARNING] Log rotation failed: {}. Continuing with current file.",
                    e
                );

                if self.writer.is_none() {
                    match Self::open_current(&self.base_path) {
                        Ok((file, _)) => self.writer = Some(BufWriter::new(file)),
                        Err(reopen_err) => {
                            eprintln!(
                                "[LOGGER ERROR] Failed to reopen log file after rotation failure: {}",
                                reopen_err
                            );
                            return Err(e);
                        }
                    }
                }

                // Let the file grow rather than retry on every line
                self.current_size = 0;
            }
        }

        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| LoggerError::writer("Rolling file writer not initialized"))?;

        writer.write_all(line.as_bytes()).map_err(|e| {
            LoggerError::file_appender(
                self.base_path.display().to_string(),
                format!("Failed to write log line: {}", e),
            )
        })?;
        self.current_size += incoming;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        if let Some(ref mut writer) = self.writer {
            writer.flush().map_err(|e| {
                LoggerError::file_appender(
                    self.base_path.display().to_string(),
                    format!("Failed to flush: {}", e),
                )
            })?;
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "rolling_file"
    }
}

impl Drop for RollingFileSink {
    fn drop(&mut self) {
        if let Some(mut writer) = self.writer.take() {
            let _ = writer.flush();
        }
    }
}
