//! IMAP implementation of the [`Mailbox`] capability.
//!
//! Each call opens a fresh TLS session, does its work and logs out; the
//! pipeline runs once a day, so there is nothing to gain from keeping a
//! connection warm.

use async_trait::async_trait;
use chrono::{DateTime, Local, TimeZone};
use futures::StreamExt;
use mail_parser::MimeHeaders;
use std::path::{Path, PathBuf};

use fundwatch_core::config::ImapConfig;
use fundwatch_core::error::{FundWatchError, Result};

use crate::{MailAttachment, MailMessage, Mailbox};

/// TLS IMAP stream type used throughout this module.
type ImapTlsStream = async_imap::Client<tokio_native_tls::TlsStream<tokio::net::TcpStream>>;
type ImapSession = async_imap::Session<tokio_native_tls::TlsStream<tokio::net::TcpStream>>;

/// Create a TLS-wrapped IMAP connection.
async fn connect_tls(host: &str, port: u16) -> Result<ImapTlsStream> {
    let tcp = tokio::net::TcpStream::connect((host, port))
        .await
        .map_err(|e| FundWatchError::Mailbox(format!("TCP connect: {e}")))?;

    let connector = native_tls::TlsConnector::new()
        .map_err(|e| FundWatchError::Mailbox(format!("TLS connector: {e}")))?;
    let connector = tokio_native_tls::TlsConnector::from(connector);

    let tls_stream = connector
        .connect(host, tcp)
        .await
        .map_err(|e| FundWatchError::Mailbox(format!("TLS handshake: {e}")))?;

    Ok(async_imap::Client::new(tls_stream))
}

/// IMAP-backed mailbox.
pub struct ImapMailbox {
    config: ImapConfig,
}

impl ImapMailbox {
    pub fn new(config: ImapConfig) -> Self {
        Self { config }
    }

    async fn login(&self) -> Result<ImapSession> {
        let client = connect_tls(&self.config.host, self.config.port).await?;
        client
            .login(&self.config.email, &self.config.password)
            .await
            .map_err(|e| FundWatchError::AuthFailed(format!("IMAP login: {}", e.0)))
    }
}

#[async_trait]
impl Mailbox for ImapMailbox {
    async fn connect(&mut self) -> Result<()> {
        let mut session = self.login().await?;
        session.logout().await.ok();
        tracing::info!("📧 Mail account reachable: {}", self.config.email);
        Ok(())
    }

    async fn list_recent(&mut self, limit: usize) -> Result<Vec<MailMessage>> {
        let mut session = self.login().await?;
        let mailbox = session
            .select(&self.config.mailbox)
            .await
            .map_err(|e| FundWatchError::Mailbox(format!("Select: {e}")))?;

        let exists = mailbox.exists;
        if exists == 0 {
            session.logout().await.ok();
            return Ok(Vec::new());
        }

        // Highest sequence numbers are the newest messages.
        let start = exists.saturating_sub(limit as u32) + 1;
        let seq = format!("{start}:{exists}");
        let mut stream = session
            .fetch(&seq, "(RFC822 INTERNALDATE)")
            .await
            .map_err(|e| FundWatchError::Mailbox(format!("Fetch: {e}")))?;

        let mut messages = Vec::new();
        while let Some(result) = stream.next().await {
            let fetch = result.map_err(|e| FundWatchError::Mailbox(format!("Fetch msg: {e}")))?;
            let received = fetch
                .internal_date()
                .map(|d| d.with_timezone(&Local))
                .unwrap_or_else(Local::now);
            if let Some(raw) = fetch.body()
                && let Some(msg) = parse_message(raw, received)
            {
                messages.push(msg);
            }
        }
        drop(stream);
        session.logout().await.ok();

        messages.sort_by(|a, b| b.received.cmp(&a.received));
        tracing::info!("📧 Listed {} recent message(s)", messages.len());
        Ok(messages)
    }

    async fn save_attachment(&self, att: &MailAttachment, target: &Path) -> Result<PathBuf> {
        tokio::fs::write(target, &att.data).await?;
        Ok(target.to_path_buf())
    }
}

/// Parse raw message bytes into the mailbox-neutral shape.
fn parse_message(raw: &[u8], fallback_received: DateTime<Local>) -> Option<MailMessage> {
    use mail_parser::MessageParser;
    let parsed = MessageParser::default().parse(raw)?;

    let subject = parsed.subject().unwrap_or("(no subject)").to_string();
    let received = parsed
        .date()
        .and_then(|d| Local.timestamp_opt(d.to_timestamp(), 0).single())
        .unwrap_or(fallback_received);

    let attachments = parsed
        .attachments()
        .filter_map(|part| {
            part.attachment_name().map(|name| MailAttachment {
                filename: name.to_string(),
                data: part.contents().to_vec(),
            })
        })
        .collect();

    Some(MailMessage {
        subject,
        received,
        attachments,
    })
}
