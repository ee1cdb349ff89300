//! Operator alerts.
//!
//! Blocks are escalated to humans through an `AlertDispatcher`, which fans an
//! `AlertEvent` out to every notifier that accepts its severity. Delivery is
//! best effort: a failing notifier is logged and never changes the fetch
//! outcome.

mod dispatcher;
mod slack;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{error, info, warn};
use strum_macros::AsRefStr;

pub use dispatcher::{AlertDispatcher, SOURCE_BLOCKED};
pub use slack::SlackNotifier;

/// Alert urgency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

/// One alert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertEvent {
    pub severity: Severity,
    /// Machine-readable type, e.g. `SOURCE_BLOCKED`
    pub kind: String,
    pub message: String,
    /// Ordered key/value details
    pub context: Vec<(String, String)>,
    pub occurred_at: DateTime<Utc>,
}

impl AlertEvent {
    pub fn new(severity: Severity, kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity,
            kind: kind.into(),
            message: message.into(),
            context: Vec::new(),
            occurred_at: Utc::now(),
        }
    }

    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.push((key.into(), value.into()));
        self
    }

    /// Value of a context entry.
    pub fn context_value(&self, key: &str) -> Option<&str> {
        self.context
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// A delivery channel for alerts.
#[async_trait]
pub trait AlertNotifier: Send + Sync {
    /// Whether this notifier wants events of `severity`.
    fn supports(&self, severity: Severity) -> bool;

    async fn notify(&self, event: &AlertEvent) -> anyhow::Result<()>;
}

/// Writes alerts to the log. Accepts every severity.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl AlertNotifier for LogNotifier {
    fn supports(&self, _severity: Severity) -> bool {
        true
    }

    async fn notify(&self, event: &AlertEvent) -> anyhow::Result<()> {
        let context = event
            .context
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(" ");
        let line = format!(
            "[{}] {}: {} {}",
            event.severity.as_ref(),
            event.kind,
            event.message,
            context
        );
        match event.severity {
            Severity::Critical => error!("{}", line),
            Severity::Warning => warn!("{}", line),
            Severity::Info => info!("{}", line),
        }
        Ok(())
    }
}
