//! FundWatch configuration system.
//!
//! Everything is environment-sourced and resolved exactly once at startup;
//! the resulting [`RunConfig`] is read-only for the rest of the process.
//! Optional values that are absent mean "feature disabled, log and skip".

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration for a single pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Folder where the report attachment is saved and later validated.
    #[serde(default = "default_root_path")]
    pub root_path: PathBuf,
    /// Subject affix (prefix-or-suffix) identifying the report email.
    #[serde(default = "default_subject_pattern")]
    pub subject_pattern: String,
    /// Column whose missing values are counted.
    #[serde(default = "default_column")]
    pub column: String,
    /// Maximum tolerable count of missing values in that column.
    #[serde(default = "default_threshold")]
    pub threshold: usize,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub log: LogConfig,
    #[serde(default)]
    pub imap: ImapConfig,
}

fn default_root_path() -> PathBuf {
    PathBuf::from("reports")
}
fn default_subject_pattern() -> String {
    "Daily Fundos".into()
}
fn default_column() -> String {
    "Retorno".into()
}
fn default_threshold() -> usize {
    30
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            root_path: default_root_path(),
            subject_pattern: default_subject_pattern(),
            column: default_column(),
            threshold: default_threshold(),
            retry: RetryConfig::default(),
            log: LogConfig::default(),
            imap: ImapConfig::default(),
        }
    }
}

impl RunConfig {
    /// Resolve configuration from the process environment.
    pub fn from_env() -> Self {
        Self {
            root_path: env_var("FUNDWATCH_ROOT")
                .map(PathBuf::from)
                .unwrap_or_else(default_root_path),
            subject_pattern: env_var("FUNDWATCH_SUBJECT_PATTERN")
                .unwrap_or_else(default_subject_pattern),
            column: env_var("FUNDWATCH_COLUMN").unwrap_or_else(default_column),
            threshold: env_parse("FUNDWATCH_THRESHOLD").unwrap_or_else(default_threshold),
            retry: RetryConfig::from_env(),
            log: LogConfig::from_env(),
            imap: ImapConfig::from_env(),
        }
    }
}

/// Retry policy for the fetch stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Whole-fetch attempts before giving up.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,
    /// Seconds slept between fetch attempts.
    #[serde(default = "default_retry_secs")]
    pub retry_interval_secs: u64,
    /// Warm-up wait before the single reconnect of the recovery cycle.
    #[serde(default = "default_warmup_secs")]
    pub warmup_secs: u64,
}

fn default_max_attempts() -> usize {
    3
}
fn default_retry_secs() -> u64 {
    30
}
fn default_warmup_secs() -> u64 {
    8
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            retry_interval_secs: default_retry_secs(),
            warmup_secs: default_warmup_secs(),
        }
    }
}

impl RetryConfig {
    pub fn from_env() -> Self {
        Self {
            max_attempts: env_parse("FUNDWATCH_MAX_ATTEMPTS").unwrap_or_else(default_max_attempts),
            retry_interval_secs: env_parse("FUNDWATCH_RETRY_SECS")
                .unwrap_or_else(default_retry_secs),
            warmup_secs: env_parse("FUNDWATCH_WARMUP_SECS").unwrap_or_else(default_warmup_secs),
        }
    }
}

/// Log book destination.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    #[serde(default = "default_log_dir")]
    pub directory: PathBuf,
    #[serde(default = "default_log_prefix")]
    pub prefix: String,
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}
fn default_log_prefix() -> String {
    "fundwatch".into()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            directory: default_log_dir(),
            prefix: default_log_prefix(),
        }
    }
}

impl LogConfig {
    pub fn from_env() -> Self {
        Self {
            directory: env_var("FUNDWATCH_LOG_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(default_log_dir),
            prefix: env_var("FUNDWATCH_LOG_PREFIX").unwrap_or_else(default_log_prefix),
        }
    }
}

/// IMAP account settings for the attachment fetcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImapConfig {
    #[serde(default)]
    pub host: String,
    #[serde(default = "default_imap_port")]
    pub port: u16,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_mailbox")]
    pub mailbox: String,
}

fn default_imap_port() -> u16 {
    993
}
fn default_mailbox() -> String {
    "INBOX".into()
}

impl Default for ImapConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: default_imap_port(),
            email: String::new(),
            password: String::new(),
            mailbox: default_mailbox(),
        }
    }
}

impl ImapConfig {
    pub fn from_env() -> Self {
        Self {
            host: env_var("IMAP_HOST").unwrap_or_default(),
            port: env_parse("IMAP_PORT").unwrap_or_else(default_imap_port),
            email: env_var("IMAP_USER").unwrap_or_default(),
            password: env_var("IMAP_PASSWORD").unwrap_or_default(),
            mailbox: env_var("IMAP_MAILBOX").unwrap_or_else(default_mailbox),
        }
    }
}

fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env_var(key).and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = RunConfig::default();
        assert_eq!(config.column, "Retorno");
        assert_eq!(config.threshold, 30);
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.imap.port, 993);
        assert_eq!(config.imap.mailbox, "INBOX");
    }

    #[test]
    fn serde_defaults_fill_missing_fields() {
        let config: RunConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.subject_pattern, "Daily Fundos");
        assert_eq!(config.log.prefix, "fundwatch");
        assert_eq!(config.retry.warmup_secs, 8);
    }
}
