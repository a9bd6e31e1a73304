//! Teams notifier — MessageCard payload posted to an incoming webhook.

use async_trait::async_trait;
use serde_json::{Value, json};

use fundwatch_core::logbook::LogBook;

use crate::{Delivery, Notifier};

/// Webhook settings, environment-sourced.
#[derive(Debug, Clone)]
pub struct TeamsConfig {
    pub webhook_url: String,
}

impl TeamsConfig {
    pub fn from_env() -> Option<Self> {
        std::env::var("TEAMS_WEBHOOK_URL")
            .ok()
            .filter(|v| !v.is_empty())
            .map(|webhook_url| Self { webhook_url })
    }
}

/// Chat channel for run outcomes.
pub struct TeamsNotifier {
    config: Option<TeamsConfig>,
}

impl TeamsNotifier {
    pub fn new(config: Option<TeamsConfig>) -> Self {
        Self { config }
    }

    pub fn from_env() -> Self {
        Self::new(TeamsConfig::from_env())
    }

    async fn post(&self, card: Value, log: &LogBook) -> Delivery {
        let Some(config) = &self.config else {
            log.error("TEAMS_WEBHOOK_URL not set; Teams notification skipped.");
            return Delivery::ConfigMissing;
        };

        match deliver(&config.webhook_url, &card).await {
            Ok(()) => {
                log.info("Teams notification delivered.");
                Delivery::Sent
            }
            Err(e) => {
                log.error_with_detail("Failed to post to the Teams webhook", e);
                Delivery::TransportError
            }
        }
    }
}

async fn deliver(url: &str, card: &Value) -> fundwatch_core::Result<()> {
    use fundwatch_core::error::FundWatchError;

    // TLS certificate verification is intentionally disabled for the
    // webhook endpoint.
    let client = reqwest::Client::builder()
        .danger_accept_invalid_certs(true)
        .build()
        .map_err(|e| FundWatchError::Notify(format!("HTTP client: {e}")))?;

    client
        .post(url)
        .json(card)
        .send()
        .await
        .map_err(|e| FundWatchError::Notify(format!("Webhook post: {e}")))?
        .error_for_status()
        .map_err(|e| FundWatchError::Notify(format!("Webhook status: {e}")))?;
    Ok(())
}

/// MessageCard for the quality alert.
pub fn alert_card(missing: usize, threshold: usize) -> Value {
    json!({
        "@type": "MessageCard",
        "@context": "http://schema.org/extensions",
        "themeColor": "d9534f",
        "summary": "Data Quality Alert",
        "sections": [{
            "activityTitle": "⚠️ Data Quality Alert",
            "activitySubtitle": "FundWatch - Automated Data Check",
            "facts": [
                { "name": "Status:", "value": "VALIDATION FAILED" },
                { "name": "Missing values found:", "value": missing.to_string() },
                { "name": "Permitted limit:", "value": threshold.to_string() },
            ],
            "text": "The amount of absent data in the spreadsheet exceeded the configured limit. Please check the source spreadsheet.",
        }],
    })
}

/// MessageCard for the success notice.
pub fn success_card() -> Value {
    json!({
        "@type": "MessageCard",
        "@context": "http://schema.org/extensions",
        "themeColor": "5cb85c",
        "summary": "Data Quality Check Passed",
        "sections": [{
            "activityTitle": "✅ Data Quality Check Passed",
            "activitySubtitle": "FundWatch - Automated Data Check",
            "facts": [
                { "name": "Status:", "value": "OK" },
            ],
            "text": "Today's spreadsheet was retrieved and is within the data-quality limit.",
        }],
    })
}

#[async_trait]
impl Notifier for TeamsNotifier {
    fn name(&self) -> &str {
        "teams"
    }

    async fn notify_success(&self, log: &LogBook) -> Delivery {
        log.action("Preparing the Teams success notification...");
        self.post(success_card(), log).await
    }

    async fn notify_failure(&self, missing: usize, threshold: usize, log: &LogBook) -> Delivery {
        log.action("Preparing the Teams alert...");
        self.post(alert_card(missing, threshold), log).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn missing_webhook_is_a_logged_skip() {
        let dir = tempdir().unwrap();
        let log = LogBook::new(dir.path(), "test");
        let notifier = TeamsNotifier::new(None);

        assert_eq!(notifier.notify_success(&log).await, Delivery::ConfigMissing);
        assert_eq!(
            notifier.notify_failure(45, 30, &log).await,
            Delivery::ConfigMissing
        );
        assert_eq!(log.error_entries().len(), 2);
    }

    #[test]
    fn alert_card_carries_the_facts() {
        let card = alert_card(45, 30);
        assert_eq!(card["@type"], "MessageCard");
        let facts = card["sections"][0]["facts"].as_array().unwrap();
        assert!(facts.iter().any(|f| f["value"] == "45"));
        assert!(facts.iter().any(|f| f["value"] == "30"));
        assert!(facts.iter().any(|f| f["value"] == "VALIDATION FAILED"));
    }

    #[test]
    fn success_card_is_green() {
        let card = success_card();
        assert_eq!(card["themeColor"], "5cb85c");
        assert_eq!(card["summary"], "Data Quality Check Passed");
    }
}
