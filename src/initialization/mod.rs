//! Application initialization and resource setup.
//!
//! This module provides functions to initialize all shared resources:
//! - Logger (plain or JSON, with secret redaction)
//! - HTTP client (SSRF-safe resolver, redirects disabled)
//! - Rate limiter backing store (state file or SQLite pool)
//! - The fetch orchestrator wiring them together
//!
//! All initialization functions return proper error types for error handling.

mod client;
mod logger;

use std::sync::Arc;

use log::info;

use crate::alerts::{AlertDispatcher, LogNotifier, SlackNotifier};
use crate::cache::ResponseCache;
use crate::config::{FetchConfig, StateBackend};
use crate::error_handling::{InitializationError, RateLimitStoreError};
use crate::fetch::{FetchOrchestrator, ReqwestTransport};
use crate::rate_limiter::{DatabaseRateLimiter, FileRateLimiter, RateLimiter};
use crate::security::AllowedDomainPolicy;
use crate::storage::{init_db_pool_with_path, run_migrations, SqliteSourceBlockRepository};
use crate::user_agent::UserAgentProvider;

// Re-export public API
pub use client::init_client;
pub use logger::{init_logger_with, redact_secrets};

/// Opens the rate limiter backend selected by `config.state_backend`.
///
/// The file backend creates `config.state_path` as a directory; the SQLite
/// backend opens (or creates) `config.state_path` as a database file and
/// applies the embedded migrations.
///
/// # Errors
///
/// Returns `InitializationError::RateLimiterError` if the state directory or
/// database cannot be opened.
pub async fn init_rate_limiter(
    config: &FetchConfig,
) -> Result<Arc<dyn RateLimiter>, InitializationError> {
    match config.state_backend {
        StateBackend::File => {
            let limiter = FileRateLimiter::open(&config.state_path, config.pacing.clone())?;
            info!("Rate limiter state file: {}", limiter.path().display());
            Ok(Arc::new(limiter))
        }
        StateBackend::Sqlite => {
            let pool = init_db_pool_with_path(&config.state_path)
                .await
                .map_err(RateLimitStoreError::from)?;
            run_migrations(&pool)
                .await
                .map_err(RateLimitStoreError::from)?;
            info!("Rate limiter database: {}", config.state_path.display());
            let repository = Arc::new(SqliteSourceBlockRepository::new(pool));
            Ok(Arc::new(DatabaseRateLimiter::new(
                repository,
                config.pacing.clone(),
            )))
        }
    }
}

/// Alert channels: the log always, Slack when a webhook is configured.
pub fn init_alerts(slack_webhook: Option<&str>, client: &reqwest::Client) -> AlertDispatcher {
    let dispatcher = AlertDispatcher::default().with_notifier(Arc::new(LogNotifier));
    match slack_webhook.map(str::trim).filter(|url| !url.is_empty()) {
        Some(url) => dispatcher.with_notifier(Arc::new(SlackNotifier::new(url, client.clone()))),
        None => dispatcher,
    }
}

/// Builds a production `FetchOrchestrator` from `config`.
///
/// Uses the reqwest transport, the allowlist policy with system DNS, the
/// configured rate limiter backend and, when `config.cached_provider_domain`
/// is set, a run-scoped response cache.
///
/// # Errors
///
/// Returns an error if the HTTP client or the rate limiter cannot be created.
pub async fn init_orchestrator(
    config: FetchConfig,
    user_agents: Option<Arc<dyn UserAgentProvider>>,
    slack_webhook: Option<&str>,
) -> Result<FetchOrchestrator, InitializationError> {
    let client = init_client(&config)?;
    let rate_limiter = init_rate_limiter(&config).await?;
    let policy = Arc::new(AllowedDomainPolicy::new(config.allowed_domains.iter()));
    let alerts = init_alerts(slack_webhook, &client);
    let cache = config
        .cached_provider_domain
        .as_deref()
        .map(|domain| Arc::new(ResponseCache::new(domain)));

    let mut builder = FetchOrchestrator::builder(
        Arc::new(ReqwestTransport::new(client)),
        rate_limiter,
        policy,
    )
    .alerts(alerts);
    if let Some(user_agents) = user_agents {
        builder = builder.user_agents(user_agents);
    }
    if let Some(cache) = cache {
        builder = builder.response_cache(cache);
    }
    Ok(builder.config(config).build())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[tokio::test]
    async fn test_init_file_rate_limiter() {
        let dir = tempfile::tempdir().unwrap();
        let config = FetchConfig {
            state_backend: StateBackend::File,
            state_path: dir.path().join("state"),
            ..Default::default()
        };
        let limiter = init_rate_limiter(&config).await.unwrap();
        assert!(!limiter.is_rate_limited("finance.yahoo.com").await.unwrap());
        assert!(dir.path().join("state").is_dir());
    }

    #[tokio::test]
    async fn test_init_sqlite_rate_limiter() {
        let dir = tempfile::tempdir().unwrap();
        let db: PathBuf = dir.path().join("nested").join("limits.db");
        let config = FetchConfig {
            state_backend: StateBackend::Sqlite,
            state_path: db.clone(),
            ..Default::default()
        };
        let limiter = init_rate_limiter(&config).await.unwrap();
        assert_eq!(
            limiter
                .consecutive_block_count("finance.yahoo.com")
                .await
                .unwrap(),
            0
        );
        assert!(db.exists());
    }

    #[tokio::test]
    async fn test_init_alerts() {
        let client = reqwest::Client::new();
        assert!(!init_alerts(None, &client).is_empty());
        assert!(!init_alerts(Some("  "), &client).is_empty());
        assert!(!init_alerts(Some("https://hooks.slack.com/services/T/B/X"), &client).is_empty());
    }

    #[tokio::test]
    async fn test_init_orchestrator() {
        let dir = tempfile::tempdir().unwrap();
        let config = FetchConfig {
            allowed_domains: vec!["finance.yahoo.com".into()],
            state_path: dir.path().to_path_buf(),
            ..Default::default()
        };
        let orchestrator = init_orchestrator(config, None, None).await.unwrap();
        assert_eq!(orchestrator.config().allowed_domains, vec!["finance.yahoo.com"]);
        assert!(!orchestrator
            .is_rate_limited("finance.yahoo.com")
            .await
            .unwrap());
    }
}
