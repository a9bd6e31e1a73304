//! Outcome notifiers — email (SMTP) and chat webhook.
//!
//! Notification must never crash the run. The trait methods are infallible
//! by contract; anything that goes wrong is logged and encoded in
//! [`Delivery`] so callers can still tell "skipped by design" from
//! "attempted and failed".

use async_trait::async_trait;

use fundwatch_core::logbook::LogBook;

pub mod email;
pub mod teams;

pub use email::{EmailConfig, EmailNotifier};
pub use teams::{TeamsConfig, TeamsNotifier};

/// What happened to one notification attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Handed to the transport successfully.
    Sent,
    /// Required configuration absent; skipped by design.
    ConfigMissing,
    /// Attempted and failed; details are in the log book.
    TransportError,
}

/// A delivery channel for the run outcome.
#[async_trait]
pub trait Notifier: Send + Sync {
    fn name(&self) -> &str;

    /// Report that the spreadsheet passed the quality check.
    async fn notify_success(&self, log: &LogBook) -> Delivery;

    /// Report that missing values exceeded the permitted limit.
    async fn notify_failure(&self, missing: usize, threshold: usize, log: &LogBook) -> Delivery;
}
