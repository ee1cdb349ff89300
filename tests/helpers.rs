// Shared test helpers for orchestrator wiring and database setup.
//
// This module provides common utilities used across multiple test files to reduce duplication.

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use url::Url;

use source_fetch::alerts::{AlertDispatcher, AlertEvent, AlertNotifier, Severity};
use source_fetch::fetch::ReqwestTransport;
use source_fetch::initialization::init_client;
use source_fetch::storage::{init_db_pool_with_path, run_migrations};
use source_fetch::{
    DomainPolicy, FetchConfig, FetchError, FetchOrchestrator, NetworkErrorKind, PacingTable,
    RateLimiter,
};

/// Creates an in-memory database pool with migrations applied.
///
/// A single connection, because every in-memory connection is its own database.
#[allow(dead_code)] // Used by other test files
pub async fn create_test_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create test database pool");
    run_migrations(&pool)
        .await
        .expect("Failed to run migrations");
    pool
}

/// Opens a file-backed database through the library and applies migrations.
#[allow(dead_code)]
pub async fn create_test_pool_with_path(db_path: &Path) -> SqlitePool {
    let pool = init_db_pool_with_path(db_path)
        .await
        .expect("Failed to create test database");
    run_migrations(&pool)
        .await
        .expect("Failed to run migrations");
    pool
}

/// Allowlist without DNS or SSRF checks, so wiremock on 127.0.0.1 is reachable.
#[allow(dead_code)]
pub struct HostAllowlist(pub Vec<String>);

#[async_trait]
impl DomainPolicy for HostAllowlist {
    async fn assert_allowed(&self, url: &str) -> Result<Url, FetchError> {
        let parsed =
            Url::parse(url).map_err(|_| FetchError::network(NetworkErrorKind::InvalidUrl, url))?;
        match parsed.host_str() {
            Some(host) if self.0.iter().any(|allowed| allowed == host) => Ok(parsed),
            _ => Err(FetchError::network(NetworkErrorKind::DomainNotAllowed, url)),
        }
    }
}

/// Collects every alert it receives.
#[allow(dead_code)]
#[derive(Default)]
pub struct AlertSink(pub Mutex<Vec<AlertEvent>>);

#[allow(dead_code)]
impl AlertSink {
    pub fn events(&self) -> Vec<AlertEvent> {
        self.0.lock().unwrap().clone()
    }
}

#[async_trait]
impl AlertNotifier for AlertSink {
    fn supports(&self, _severity: Severity) -> bool {
        true
    }

    async fn notify(&self, event: &AlertEvent) -> anyhow::Result<()> {
        self.0.lock().unwrap().push(event.clone());
        Ok(())
    }
}

/// Configuration with no pacing delay and short timeouts.
#[allow(dead_code)]
pub fn fast_config() -> FetchConfig {
    FetchConfig {
        allowed_domains: vec!["127.0.0.1".to_string()],
        pacing: PacingTable::new(Duration::ZERO),
        request_timeout: Duration::from_secs(5),
        connect_timeout: Duration::from_secs(2),
        cached_provider_domain: None,
        ..Default::default()
    }
}

/// Orchestrator over a real reqwest client, allowing only 127.0.0.1.
#[allow(dead_code)]
pub fn local_orchestrator(
    rate_limiter: Arc<dyn RateLimiter>,
    alerts: Arc<AlertSink>,
) -> FetchOrchestrator {
    let config = fast_config();
    let client = init_client(&config).expect("Failed to build HTTP client");
    FetchOrchestrator::builder(
        Arc::new(ReqwestTransport::new(client)),
        rate_limiter,
        Arc::new(HostAllowlist(config.allowed_domains.clone())),
    )
    .config(config)
    .alerts(AlertDispatcher::default().with_notifier(alerts))
    .build()
}
