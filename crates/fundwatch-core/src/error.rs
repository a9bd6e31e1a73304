//! FundWatch error types.

use thiserror::Error;

/// All errors the pipeline can produce.
#[derive(Error, Debug)]
pub enum FundWatchError {
    #[error("Mailbox error: {0}")]
    Mailbox(String),

    #[error("Authentication failed: {0}")]
    AuthFailed(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Quality check error: {0}")]
    Quality(String),

    #[error("Notification error: {0}")]
    Notify(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias used throughout FundWatch.
pub type Result<T> = std::result::Result<T, FundWatchError>;
