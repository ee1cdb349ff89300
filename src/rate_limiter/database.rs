//! Database-backed rate limiter.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{Pacer, RateLimiter};
use crate::config::PacingTable;
use crate::error_handling::{BlockCause, RateLimitStoreError};
use crate::storage::SourceBlockRepository;

/// Rate limiter over a `SourceBlockRepository`.
///
/// Block state is shared by every process using the same database; pacing is
/// per process.
pub struct DatabaseRateLimiter {
    repository: Arc<dyn SourceBlockRepository>,
    pacer: Pacer,
}

impl DatabaseRateLimiter {
    pub fn new(repository: Arc<dyn SourceBlockRepository>, pacing: PacingTable) -> Self {
        Self {
            repository,
            pacer: Pacer::new(pacing),
        }
    }

    pub fn repository(&self) -> &Arc<dyn SourceBlockRepository> {
        &self.repository
    }
}

#[async_trait]
impl RateLimiter for DatabaseRateLimiter {
    async fn is_rate_limited(&self, domain: &str) -> Result<bool, RateLimitStoreError> {
        Ok(self.repository.is_blocked(domain).await?)
    }

    async fn retry_time(&self, domain: &str) -> Result<Option<DateTime<Utc>>, RateLimitStoreError> {
        let now = Utc::now();
        Ok(self
            .repository
            .blocked_until(domain)
            .await?
            .filter(|until| *until > now))
    }

    async fn wait(&self, domain: &str) {
        self.pacer.wait(domain).await;
    }

    async fn record_attempt(&self, domain: &str) {
        self.pacer.record_attempt(domain);
    }

    async fn record_success(&self, domain: &str) -> Result<(), RateLimitStoreError> {
        Ok(self.repository.clear_block(domain).await?)
    }

    async fn record_block(
        &self,
        domain: &str,
        retry_until: DateTime<Utc>,
        cause: &BlockCause,
    ) -> Result<(), RateLimitStoreError> {
        self.repository
            .record_block(domain, retry_until, cause.status_code(), Some(cause.to_string()))
            .await?;
        Ok(())
    }

    async fn consecutive_block_count(&self, domain: &str) -> Result<u32, RateLimitStoreError> {
        Ok(self.repository.consecutive_count(domain).await?)
    }

    async fn block(
        &self,
        domain: &str,
        until: DateTime<Utc>,
        cause: &BlockCause,
    ) -> Result<(), RateLimitStoreError> {
        self.repository
            .set_blocked_until(domain, until, cause.status_code(), Some(cause.to_string()))
            .await?;
        Ok(())
    }
}
