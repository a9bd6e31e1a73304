//! Email notifier — HTML alert/success mail over SMTP with STARTTLS.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use fundwatch_core::logbook::LogBook;

use crate::{Delivery, Notifier};

/// SMTP delivery settings, environment-sourced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    #[serde(default = "default_smtp_host")]
    pub smtp_host: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    pub user: String,
    pub password: String,
    pub recipient: String,
}

fn default_smtp_host() -> String {
    "smtp.office365.com".into()
}
fn default_smtp_port() -> u16 {
    587
}

impl EmailConfig {
    /// Read from the environment. `None` when any required value is absent,
    /// which downgrades the channel to a logged skip.
    pub fn from_env() -> Option<Self> {
        Some(Self {
            smtp_host: env_var("SMTP_HOST").unwrap_or_else(default_smtp_host),
            smtp_port: env_var("SMTP_PORT")
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_smtp_port),
            user: env_var("EMAIL_USER")?,
            password: env_var("EMAIL_PASSWORD")?,
            recipient: env_var("EMAIL_RECIPIENT")?,
        })
    }
}

fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Email channel for run outcomes.
pub struct EmailNotifier {
    config: Option<EmailConfig>,
}

impl EmailNotifier {
    pub fn new(config: Option<EmailConfig>) -> Self {
        Self { config }
    }

    pub fn from_env() -> Self {
        Self::new(EmailConfig::from_env())
    }

    async fn send(&self, subject: &str, html: String, log: &LogBook) -> Delivery {
        let Some(config) = &self.config else {
            log.error(
                "EMAIL_USER, EMAIL_PASSWORD or EMAIL_RECIPIENT not set; \
                 email notification skipped.",
            );
            return Delivery::ConfigMissing;
        };

        match deliver(config, subject, html).await {
            Ok(()) => {
                log.info(format!("Email sent to {}.", config.recipient));
                Delivery::Sent
            }
            Err(e) => {
                log.error_with_detail("Failed to send notification email", e);
                Delivery::TransportError
            }
        }
    }
}

async fn deliver(
    config: &EmailConfig,
    subject: &str,
    html: String,
) -> fundwatch_core::Result<()> {
    use fundwatch_core::error::FundWatchError;
    use lettre::{
        AsyncSmtpTransport, AsyncTransport, Message, message::Mailbox,
        message::header::ContentType, transport::smtp::authentication::Credentials,
    };

    let from: Mailbox = config
        .user
        .parse()
        .map_err(|e| FundWatchError::Notify(format!("Invalid from: {e}")))?;
    let to: Mailbox = config
        .recipient
        .parse()
        .map_err(|e| FundWatchError::Notify(format!("Invalid to: {e}")))?;

    let email = Message::builder()
        .from(from)
        .to(to)
        .subject(subject)
        .header(ContentType::TEXT_HTML)
        .body(html)
        .map_err(|e| FundWatchError::Notify(format!("Build email: {e}")))?;

    let creds = Credentials::new(config.user.clone(), config.password.clone());
    let mailer = AsyncSmtpTransport::<lettre::Tokio1Executor>::starttls_relay(&config.smtp_host)
        .map_err(|e| FundWatchError::Notify(format!("SMTP relay: {e}")))?
        .port(config.smtp_port)
        .credentials(creds)
        .build();

    mailer
        .send(email)
        .await
        .map_err(|e| FundWatchError::Notify(format!("SMTP send: {e}")))?;
    Ok(())
}

/// HTML body for the quality alert.
pub fn alert_body(missing: usize, threshold: usize) -> String {
    format!(
        r#"<html>
<body style="font-family: sans-serif;">
    <h2 style="color: #d9534f;">Data Quality Alert</h2>
    <p>Hello,</p>
    <p>The automated check found a problem in the freshly processed spreadsheet.</p>
    <ul style="list-style-type: none; padding: 0;">
        <li style="padding: 5px;"><strong>Missing values found:</strong> <span style="color: #d9534f; font-weight: bold;">{missing}</span></li>
        <li style="padding: 5px;"><strong>Permitted limit:</strong> {threshold}</li>
    </ul>
    <p>The amount of absent data exceeded the configured limit.</p>
    <p><strong>Recommended action:</strong> please check the source spreadsheet before the next run.</p>
    <br>
    <p><em>This is an automated email.</em></p>
</body>
</html>"#
    )
}

/// HTML body for the success notice.
pub fn success_body() -> String {
    r#"<html>
<body style="font-family: sans-serif;">
    <h2 style="color: #5cb85c;">Data Quality Check Passed</h2>
    <p>Hello,</p>
    <p>Today's spreadsheet was retrieved and is within the data-quality limit.</p>
    <p>No action is needed.</p>
    <br>
    <p><em>This is an automated email.</em></p>
</body>
</html>"#
        .to_string()
}

#[async_trait]
impl Notifier for EmailNotifier {
    fn name(&self) -> &str {
        "email"
    }

    async fn notify_success(&self, log: &LogBook) -> Delivery {
        log.action("Preparing the success email...");
        self.send(
            "✅ Data Quality Check Passed",
            success_body(),
            log,
        )
        .await
    }

    async fn notify_failure(&self, missing: usize, threshold: usize, log: &LogBook) -> Delivery {
        log.action("Preparing the data-quality alert email...");
        self.send(
            &format!("⚠️ Data Quality Alert: {missing} Missing Values Found"),
            alert_body(missing, threshold),
            log,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn missing_config_is_a_logged_skip_not_an_error() {
        let dir = tempdir().unwrap();
        let log = LogBook::new(dir.path(), "test");
        let notifier = EmailNotifier::new(None);

        assert_eq!(notifier.notify_success(&log).await, Delivery::ConfigMissing);
        assert_eq!(
            notifier.notify_failure(45, 30, &log).await,
            Delivery::ConfigMissing
        );
        assert_eq!(log.error_entries().len(), 2);
    }

    #[test]
    fn alert_body_embeds_the_counts() {
        let body = alert_body(45, 30);
        assert!(body.contains(">45<"));
        assert!(body.contains("45"));
        assert!(body.contains("30"));
        assert!(body.contains("Data Quality Alert"));
    }
}
