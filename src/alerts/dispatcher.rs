//! Alert fan-out.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use log::error;

use super::{AlertEvent, AlertNotifier, Severity};

/// Event type raised when a source blocks collection.
pub const SOURCE_BLOCKED: &str = "SOURCE_BLOCKED";

/// Sends events to every notifier that supports their severity.
#[derive(Clone, Default)]
pub struct AlertDispatcher {
    notifiers: Vec<Arc<dyn AlertNotifier>>,
}

impl AlertDispatcher {
    pub fn new(notifiers: Vec<Arc<dyn AlertNotifier>>) -> Self {
        Self { notifiers }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn AlertNotifier>) -> Self {
        self.notifiers.push(notifier);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.notifiers.is_empty()
    }

    /// Delivers `event` to every interested notifier concurrently.
    /// Notifier failures are logged, never returned.
    pub async fn dispatch(&self, event: &AlertEvent) {
        let deliveries = self
            .notifiers
            .iter()
            .filter(|n| n.supports(event.severity))
            .map(|n| n.notify(event));
        for result in join_all(deliveries).await {
            if let Err(e) = result {
                error!("Failed to deliver {} alert: {:#}", event.kind, e);
            }
        }
    }

    /// Raises a critical `SOURCE_BLOCKED` alert. `url` must already be sanitized.
    pub async fn alert_blocked(&self, domain: &str, url: &str, retry_until: Option<DateTime<Utc>>) {
        let retry_after = retry_until
            .map(|at| at.format("%Y-%m-%d %H:%M:%S UTC").to_string())
            .unwrap_or_else(|| "unknown".to_string());

        let event = AlertEvent::new(
            Severity::Critical,
            SOURCE_BLOCKED,
            format!("Data source {} has blocked collection requests", domain),
        )
        .with_context("domain", domain)
        .with_context("blocked_url", url)
        .with_context("retry_after", retry_after)
        .with_context(
            "action_required",
            "Review rate limiting settings or enable proxy rotation",
        );

        self.dispatch(&event).await;
    }
}

impl std::fmt::Debug for AlertDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlertDispatcher")
            .field("notifiers", &self.notifiers.len())
            .finish()
    }
}
