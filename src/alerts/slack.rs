//! Slack incoming-webhook notifier.

use async_trait::async_trait;
use serde_json::{json, Value};

use super::{AlertEvent, AlertNotifier, Severity};
use crate::config::ALERT_WEBHOOK_TIMEOUT;

/// Posts alerts to a Slack incoming webhook as a coloured attachment.
#[derive(Debug, Clone)]
pub struct SlackNotifier {
    webhook_url: String,
    client: reqwest::Client,
    severities: Vec<Severity>,
}

impl SlackNotifier {
    /// Notifier for warnings and critical alerts.
    pub fn new(webhook_url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            webhook_url: webhook_url.into(),
            client,
            severities: vec![Severity::Warning, Severity::Critical],
        }
    }

    pub fn with_severities(mut self, severities: Vec<Severity>) -> Self {
        self.severities = severities;
        self
    }

    fn color(severity: Severity) -> &'static str {
        match severity {
            Severity::Info => "#2196F3",
            Severity::Warning => "#FF9800",
            Severity::Critical => "#F44336",
        }
    }

    fn payload(event: &AlertEvent) -> Value {
        let fields: Vec<Value> = event
            .context
            .iter()
            .map(|(key, value)| {
                json!({
                    "title": field_title(key),
                    "value": value,
                    "short": value.len() < 40,
                })
            })
            .collect();

        json!({
            "attachments": [{
                "color": Self::color(event.severity),
                "title": format!("Source Fetch Alert: {}", event.kind),
                "text": event.message,
                "fields": fields,
                "ts": event.occurred_at.timestamp(),
            }]
        })
    }
}

/// `blocked_url` -> `Blocked url`
fn field_title(key: &str) -> String {
    let spaced = key.replace('_', " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[async_trait]
impl AlertNotifier for SlackNotifier {
    fn supports(&self, severity: Severity) -> bool {
        self.severities.contains(&severity)
    }

    async fn notify(&self, event: &AlertEvent) -> anyhow::Result<()> {
        self.client
            .post(&self.webhook_url)
            .timeout(ALERT_WEBHOOK_TIMEOUT)
            .json(&Self::payload(event))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}
