//! Per-domain rate limiting and block backoff.
//!
//! Every limiter tracks three things per domain: when the last attempt
//! finished (for pacing), until when the domain is blocked, and how many
//! blocks were recorded since the last success. Two interchangeable backends
//! implement the same contract:
//! - `FileRateLimiter`: JSON state file, single process only (development)
//! - `DatabaseRateLimiter`: SQLite table, safe for concurrent processes

mod database;
mod file;
mod pacing;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error_handling::{BlockCause, RateLimitStoreError};

pub use database::DatabaseRateLimiter;
pub use file::{FileRateLimiter, RateLimitState};
pub use pacing::Pacer;

/// Shared contract of both rate limiter backends.
///
/// `record_block` escalates the backoff (the consecutive count goes up);
/// `block` only sets the window and is used for 429 responses.
#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Whether `domain` is inside a block window right now.
    async fn is_rate_limited(&self, domain: &str) -> Result<bool, RateLimitStoreError>;

    /// End of the active block window, `None` when the domain is not blocked.
    async fn retry_time(&self, domain: &str) -> Result<Option<DateTime<Utc>>, RateLimitStoreError>;

    /// Sleeps until the domain's minimum interval since the last attempt has elapsed.
    ///
    /// Concurrent callers for one domain are released one interval apart.
    async fn wait(&self, domain: &str);

    /// Stamps the last attempt time without touching block state.
    async fn record_attempt(&self, domain: &str);

    /// Resets the consecutive block count after a successful fetch.
    async fn record_success(&self, domain: &str) -> Result<(), RateLimitStoreError>;

    /// Records a counted block lasting until `retry_until`.
    async fn record_block(
        &self,
        domain: &str,
        retry_until: DateTime<Utc>,
        cause: &BlockCause,
    ) -> Result<(), RateLimitStoreError>;

    async fn consecutive_block_count(&self, domain: &str) -> Result<u32, RateLimitStoreError>;

    /// Sets the block window without incrementing the consecutive count.
    async fn block(
        &self,
        domain: &str,
        until: DateTime<Utc>,
        cause: &BlockCause,
    ) -> Result<(), RateLimitStoreError>;
}
