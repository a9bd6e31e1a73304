//! Run log book — in-memory JSON log buffers with dated file flush.
//!
//! The book collects every entry for the run's lifetime and writes two JSON
//! files (info-level and error-level) under `<dir>/<YYYY>/<MM>/` when
//! `flush` is called. Each append also emits the matching `tracing` event so
//! the console shows the run as it happens. The book is explicitly
//! constructed and passed by reference; the top-level run function calls
//! `flush` exactly once, on success and error paths alike.

use chrono::Local;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::Result;

/// Log severity. `Action` marks the start of a pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogLevel {
    #[serde(rename = "INFO")]
    Info,
    #[serde(rename = "WARN")]
    Warn,
    #[serde(rename = "ERROR")]
    Error,
    #[serde(rename = "ACTION")]
    Action,
}

/// A single append-only log record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: String,
    pub level: LogLevel,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub traceback: Option<String>,
}

/// Dual-buffer log collector flushed to dated JSON files.
pub struct LogBook {
    info_entries: Mutex<Vec<LogEntry>>,
    error_entries: Mutex<Vec<LogEntry>>,
    info_path: PathBuf,
    error_path: PathBuf,
}

impl LogBook {
    /// Create a log book writing under `<dir>/<year>/<month>/`.
    pub fn new(dir: &Path, prefix: &str) -> Self {
        let now = Local::now();
        let day_dir = dir
            .join(now.format("%Y").to_string())
            .join(now.format("%m").to_string());
        let date = now.format("%Y%m%d");
        Self {
            info_entries: Mutex::new(Vec::new()),
            error_entries: Mutex::new(Vec::new()),
            info_path: day_dir.join(format!("{prefix}_info_{date}.json")),
            error_path: day_dir.join(format!("{prefix}_error_{date}.json")),
        }
    }

    pub fn info(&self, message: impl Into<String>) {
        let message = message.into();
        tracing::info!("{message}");
        self.append(LogLevel::Info, message, None);
    }

    pub fn warn(&self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!("{message}");
        self.append(LogLevel::Warn, message, None);
    }

    /// A stage transition or other operator-visible action.
    pub fn action(&self, message: impl Into<String>) {
        let message = message.into();
        tracing::info!("▶ {message}");
        self.append(LogLevel::Action, message, None);
    }

    pub fn error(&self, message: impl Into<String>) {
        let message = message.into();
        tracing::error!("{message}");
        self.append(LogLevel::Error, message, None);
    }

    /// Error with full diagnostic detail preserved in the JSON file.
    pub fn error_with_detail(&self, message: impl Into<String>, detail: impl std::fmt::Display) {
        let message = message.into();
        let detail = detail.to_string();
        tracing::error!("{message} | {detail}");
        self.append(LogLevel::Error, message, Some(detail));
    }

    fn append(&self, level: LogLevel, message: String, traceback: Option<String>) {
        let entry = LogEntry {
            timestamp: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            level,
            message,
            traceback,
        };
        let buffer = match level {
            LogLevel::Error => &self.error_entries,
            _ => &self.info_entries,
        };
        buffer.lock().unwrap().push(entry);
    }

    /// Write both buffers to their JSON files. Empty buffers produce no file.
    pub fn flush(&self) -> Result<()> {
        write_entries(&self.info_path, &self.info_entries.lock().unwrap())?;
        write_entries(&self.error_path, &self.error_entries.lock().unwrap())?;
        Ok(())
    }

    /// Path of the info-level file (dated, under year/month).
    pub fn info_path(&self) -> &Path {
        &self.info_path
    }

    /// Path of the error-level file.
    pub fn error_path(&self) -> &Path {
        &self.error_path
    }

    /// Snapshot of the info buffer, in append order.
    pub fn info_entries(&self) -> Vec<LogEntry> {
        self.info_entries.lock().unwrap().clone()
    }

    /// Snapshot of the error buffer, in append order.
    pub fn error_entries(&self) -> Vec<LogEntry> {
        self.error_entries.lock().unwrap().clone()
    }
}

fn write_entries(path: &Path, entries: &[LogEntry]) -> Result<()> {
    if entries.is_empty() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string_pretty(entries)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn entries_keep_append_order() {
        let dir = tempdir().unwrap();
        let book = LogBook::new(dir.path(), "test");
        book.info("first");
        book.action("second");
        book.warn("third");
        let entries = book.info_entries();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].message, "first");
        assert_eq!(entries[1].level, LogLevel::Action);
        assert_eq!(entries[2].level, LogLevel::Warn);
    }

    #[test]
    fn errors_go_to_their_own_buffer() {
        let dir = tempdir().unwrap();
        let book = LogBook::new(dir.path(), "test");
        book.info("fine");
        book.error_with_detail("boom", "stack frames here");
        assert_eq!(book.info_entries().len(), 1);
        let errors = book.error_entries();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].traceback.as_deref(), Some("stack frames here"));
    }

    #[test]
    fn flush_writes_only_non_empty_buffers() {
        let dir = tempdir().unwrap();
        let book = LogBook::new(dir.path(), "test");
        book.info("hello");
        book.flush().unwrap();
        assert!(book.info_path().exists());
        assert!(!book.error_path().exists());

        let raw = std::fs::read_to_string(book.info_path()).unwrap();
        let parsed: Vec<LogEntry> = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed[0].message, "hello");
        assert!(raw.contains("\"INFO\""));
        // traceback is omitted entirely when absent
        assert!(!raw.contains("traceback"));
    }

    #[test]
    fn paths_are_dated_year_month() {
        let dir = tempdir().unwrap();
        let book = LogBook::new(dir.path(), "daily");
        let now = Local::now();
        let expected = dir
            .path()
            .join(now.format("%Y").to_string())
            .join(now.format("%m").to_string());
        assert!(book.info_path().starts_with(&expected));
        assert!(
            book.error_path()
                .file_name()
                .unwrap()
                .to_string_lossy()
                .starts_with("daily_error_")
        );
    }
}
