//! Attachment fetcher — scans today's mail for the report and saves it.

use chrono::Local;
use std::path::Path;
use std::time::Duration;

use fundwatch_core::config::RetryConfig;
use fundwatch_core::error::Result;
use fundwatch_core::logbook::LogBook;

use crate::{MailMessage, Mailbox, RetrievedAttachment};

/// Upper bound on how many recent messages one fetch inspects.
pub const SCAN_LIMIT: usize = 50;

const SPREADSHEET_EXT: &str = ".xlsx";

/// Normalize an attachment filename for local storage: lowercase, spaces
/// and hyphens become underscores. Idempotent.
pub fn normalize_filename(name: &str) -> String {
    name.to_lowercase().replace([' ', '-'], "_")
}

/// Loose subject rule: case-sensitive prefix-or-suffix equality. May match
/// unrelated subjects sharing the affix; kept until confirmed against real
/// sample subjects.
pub fn affix_match(subject: &str, pattern: &str) -> bool {
    !pattern.is_empty() && (subject.starts_with(pattern) || subject.ends_with(pattern))
}

/// One whole fetch pass: connect (with a single recovery cycle), scan
/// today's messages newest-first, save the first qualifying attachment.
///
/// Connection failure after recovery, no matching message and no qualifying
/// attachment all come back as `Ok(None)` — "not found" is non-fatal here.
pub async fn fetch(
    mailbox: &mut dyn Mailbox,
    root: &Path,
    pattern: &str,
    warmup: Duration,
    log: &LogBook,
) -> Result<Option<RetrievedAttachment>> {
    log.action("Connecting to the mail account...");
    if !connect_with_recovery(mailbox, warmup, log).await {
        return Ok(None);
    }

    let messages = match mailbox.list_recent(SCAN_LIMIT).await {
        Ok(messages) => messages,
        Err(e) => {
            log.error_with_detail("Failed to list recent messages", e);
            return Ok(None);
        }
    };
    log.info(format!(
        "Scanning up to {} recent message(s) for subject affix '{pattern}'",
        messages.len()
    ));

    let today = Local::now().date_naive();
    for msg in &messages {
        // Messages arrive newest first, so the first older-than-today
        // message means today's mail has all been seen.
        if msg.received.date_naive() < today {
            log.info("Scan finished: reached mail received before today.");
            break;
        }
        if !affix_match(&msg.subject, pattern) {
            continue;
        }
        log.info(format!("Matching email found: '{}'", msg.subject));
        match save_first_spreadsheet(mailbox, msg, root, log).await {
            Ok(Some(att)) => return Ok(Some(att)),
            Ok(None) => {} // matched subject, no qualifying attachment
            Err(e) => {
                // one bad message must not abort the scan
                log.error_with_detail(
                    format!("Failed while processing email '{}'", msg.subject),
                    e,
                );
            }
        }
    }

    log.warn("No matching report email found among today's messages.");
    Ok(None)
}

/// Whole-fetch retry loop. Success means the saved file is actually present
/// on disk, not merely that a name was returned.
pub async fn fetch_with_retry(
    mailbox: &mut dyn Mailbox,
    root: &Path,
    pattern: &str,
    retry: &RetryConfig,
    log: &LogBook,
) -> Result<Option<RetrievedAttachment>> {
    let warmup = Duration::from_secs(retry.warmup_secs);
    for attempt in 1..=retry.max_attempts {
        log.action(format!(
            "Fetch attempt {attempt}/{}",
            retry.max_attempts
        ));
        if let Some(att) = fetch(mailbox, root, pattern, warmup, log).await? {
            if att.path.exists() {
                log.info(format!("Report confirmed on disk: {}", att.path.display()));
                return Ok(Some(att));
            }
            log.warn(format!(
                "Fetch reported '{}' but the file is not on disk.",
                att.path.display()
            ));
        }
        if attempt < retry.max_attempts {
            tokio::time::sleep(Duration::from_secs(retry.retry_interval_secs)).await;
        }
    }
    log.warn(format!(
        "Report not retrieved after {} attempt(s).",
        retry.max_attempts
    ));
    Ok(None)
}

/// Connect, and on failure wait out the warm-up interval and try exactly
/// once more before giving up for this call.
async fn connect_with_recovery(
    mailbox: &mut dyn Mailbox,
    warmup: Duration,
    log: &LogBook,
) -> bool {
    match mailbox.connect().await {
        Ok(()) => {
            log.info("Mail connection established.");
            true
        }
        Err(e) => {
            log.warn(format!(
                "Mail connection failed: {e}. Retrying after warm-up."
            ));
            tokio::time::sleep(warmup).await;
            match mailbox.connect().await {
                Ok(()) => {
                    log.info("Mail connection re-established after recovery.");
                    true
                }
                Err(e) => {
                    log.error_with_detail("Mail connection failed even after recovery", e);
                    false
                }
            }
        }
    }
}

async fn save_first_spreadsheet(
    mailbox: &dyn Mailbox,
    msg: &MailMessage,
    root: &Path,
    log: &LogBook,
) -> Result<Option<RetrievedAttachment>> {
    for att in &msg.attachments {
        if !att.filename.to_lowercase().ends_with(SPREADSHEET_EXT) {
            continue;
        }
        std::fs::create_dir_all(root)?;
        let target = root.join(normalize_filename(&att.filename));
        let path = mailbox.save_attachment(att, &target).await?;
        log.info(format!(
            "Attachment '{}' saved to: {}",
            target.file_name().unwrap_or_default().to_string_lossy(),
            path.display()
        ));
        return Ok(Some(RetrievedAttachment {
            path,
            subject: msg.subject.clone(),
        }));
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MailAttachment;
    use async_trait::async_trait;
    use chrono::{Duration as ChronoDuration, Local};
    use fundwatch_core::error::FundWatchError;
    use std::path::PathBuf;
    use tempfile::tempdir;

    struct MockMailbox {
        connect_failures: usize,
        messages: Vec<MailMessage>,
        fail_saves: bool,
        connects: usize,
    }

    impl MockMailbox {
        fn with_messages(messages: Vec<MailMessage>) -> Self {
            Self {
                connect_failures: 0,
                messages,
                fail_saves: false,
                connects: 0,
            }
        }
    }

    #[async_trait]
    impl Mailbox for MockMailbox {
        async fn connect(&mut self) -> fundwatch_core::Result<()> {
            self.connects += 1;
            if self.connect_failures > 0 {
                self.connect_failures -= 1;
                return Err(FundWatchError::Mailbox("unreachable".into()));
            }
            Ok(())
        }

        async fn list_recent(&mut self, limit: usize) -> fundwatch_core::Result<Vec<MailMessage>> {
            Ok(self.messages.iter().take(limit).cloned().collect())
        }

        async fn save_attachment(
            &self,
            att: &MailAttachment,
            target: &Path,
        ) -> fundwatch_core::Result<PathBuf> {
            if self.fail_saves {
                return Err(FundWatchError::Mailbox("save failed".into()));
            }
            std::fs::write(target, &att.data)?;
            Ok(target.to_path_buf())
        }
    }

    fn message(subject: &str, days_ago: i64, attachments: Vec<MailAttachment>) -> MailMessage {
        MailMessage {
            subject: subject.into(),
            received: Local::now() - ChronoDuration::days(days_ago),
            attachments,
        }
    }

    fn xlsx(name: &str) -> MailAttachment {
        MailAttachment {
            filename: name.into(),
            data: b"fake sheet".to_vec(),
        }
    }

    fn book() -> LogBook {
        LogBook::new(tempdir().unwrap().path(), "test")
    }

    #[test]
    fn normalization_is_idempotent() {
        let once = normalize_filename("Daily Report-2024 FINAL.xlsx");
        assert_eq!(once, "daily_report_2024_final.xlsx");
        assert_eq!(normalize_filename(&once), once);
    }

    #[test]
    fn affix_match_is_prefix_or_suffix_only() {
        assert!(affix_match("Daily Fundos 2024-01-01", "Daily Fundos"));
        assert!(affix_match("RES: Daily Fundos", "Daily Fundos"));
        assert!(!affix_match("FW: Daily Fundos attached", "Daily Fundos"));
        assert!(!affix_match("daily fundos", "Daily Fundos"));
        assert!(!affix_match("anything", ""));
    }

    #[tokio::test]
    async fn saves_first_matching_attachment() {
        let dir = tempdir().unwrap();
        let log = book();
        let mut mailbox = MockMailbox::with_messages(vec![
            message("Unrelated subject", 0, vec![xlsx("noise.xlsx")]),
            message(
                "Daily Fundos",
                0,
                vec![
                    MailAttachment {
                        filename: "notes.pdf".into(),
                        data: vec![],
                    },
                    xlsx("Daily Report-Final.XLSX"),
                ],
            ),
        ]);

        let att = fetch(
            &mut mailbox,
            dir.path(),
            "Daily Fundos",
            Duration::ZERO,
            &log,
        )
        .await
        .unwrap()
        .expect("attachment saved");

        assert_eq!(att.subject, "Daily Fundos");
        assert!(att.path.ends_with("daily_report_final.xlsx"));
        assert!(att.path.exists());
    }

    #[tokio::test]
    async fn scan_stops_at_first_older_message() {
        let dir = tempdir().unwrap();
        let log = book();
        // The matching message sits behind yesterday's mail, so the early
        // exit must hide it.
        let mut mailbox = MockMailbox::with_messages(vec![
            message("Something else", 0, vec![]),
            message("Old news", 1, vec![]),
            message("Daily Fundos", 1, vec![xlsx("report.xlsx")]),
        ]);

        let att = fetch(
            &mut mailbox,
            dir.path(),
            "Daily Fundos",
            Duration::ZERO,
            &log,
        )
        .await
        .unwrap();
        assert!(att.is_none());
    }

    #[tokio::test]
    async fn one_recovery_cycle_then_success() {
        let dir = tempdir().unwrap();
        let log = book();
        let mut mailbox =
            MockMailbox::with_messages(vec![message("Daily Fundos", 0, vec![xlsx("r.xlsx")])]);
        mailbox.connect_failures = 1;

        let att = fetch(
            &mut mailbox,
            dir.path(),
            "Daily Fundos",
            Duration::ZERO,
            &log,
        )
        .await
        .unwrap();
        assert!(att.is_some());
        assert_eq!(mailbox.connects, 2);
    }

    #[tokio::test]
    async fn connection_dead_after_recovery_is_not_found() {
        let dir = tempdir().unwrap();
        let log = book();
        let mut mailbox = MockMailbox::with_messages(vec![]);
        mailbox.connect_failures = 2;

        let att = fetch(
            &mut mailbox,
            dir.path(),
            "Daily Fundos",
            Duration::ZERO,
            &log,
        )
        .await
        .unwrap();
        assert!(att.is_none());
        assert!(!log.error_entries().is_empty());
    }

    #[tokio::test]
    async fn save_failure_does_not_abort_the_scan() {
        let dir = tempdir().unwrap();
        let log = book();
        let mut mailbox = MockMailbox::with_messages(vec![
            message("Daily Fundos", 0, vec![xlsx("broken.xlsx")]),
            message("Also today", 0, vec![]),
        ]);
        mailbox.fail_saves = true;

        let att = fetch(
            &mut mailbox,
            dir.path(),
            "Daily Fundos",
            Duration::ZERO,
            &log,
        )
        .await
        .unwrap();
        assert!(att.is_none());
        assert!(
            log.error_entries()
                .iter()
                .any(|e| e.message.contains("Daily Fundos"))
        );
    }

    #[tokio::test]
    async fn retry_exhaustion_reports_not_found() {
        let dir = tempdir().unwrap();
        let log = book();
        let mut mailbox = MockMailbox::with_messages(vec![]);
        let retry = RetryConfig {
            max_attempts: 3,
            retry_interval_secs: 0,
            warmup_secs: 0,
        };

        let att = fetch_with_retry(&mut mailbox, dir.path(), "Daily Fundos", &retry, &log)
            .await
            .unwrap();
        assert!(att.is_none());
        // one connect per attempt, none of them failing
        assert_eq!(mailbox.connects, 3);
    }
}
