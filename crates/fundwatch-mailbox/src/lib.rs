//! Mailbox capability and the daily-report attachment fetcher.
//!
//! The external mail account is modelled as the [`Mailbox`] trait so the
//! fetch/retry policy lives here while the transport lives in one
//! implementation per mail API (currently IMAP).

use async_trait::async_trait;
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};

use fundwatch_core::error::Result;

pub mod fetcher;
pub mod imap;

pub use fetcher::{affix_match, fetch, fetch_with_retry, normalize_filename};
pub use imap::ImapMailbox;

/// One message as surfaced by a mailbox implementation.
#[derive(Debug, Clone)]
pub struct MailMessage {
    pub subject: String,
    pub received: DateTime<Local>,
    pub attachments: Vec<MailAttachment>,
}

/// Attachment payload carried by a [`MailMessage`].
#[derive(Debug, Clone)]
pub struct MailAttachment {
    pub filename: String,
    pub data: Vec<u8>,
}

/// The saved report file plus the subject it came from. Lives only for the
/// duration of the run.
#[derive(Debug, Clone)]
pub struct RetrievedAttachment {
    pub path: PathBuf,
    pub subject: String,
}

/// Abstract mail-retrieval capability.
///
/// Connection recovery is a documented retry policy on this interface: the
/// fetcher calls `connect` again after a warm-up wait instead of assuming it
/// can restart anything.
#[async_trait]
pub trait Mailbox: Send {
    /// Probe the account; cheap enough to call twice during recovery.
    async fn connect(&mut self) -> Result<()>;

    /// Most recent messages, newest first, at most `limit` of them.
    async fn list_recent(&mut self, limit: usize) -> Result<Vec<MailMessage>>;

    /// Persist one attachment to `target`, returning the saved path.
    async fn save_attachment(&self, att: &MailAttachment, target: &Path) -> Result<PathBuf>;
}
