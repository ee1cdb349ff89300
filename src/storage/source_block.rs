//! Per-domain block rows.
//!
//! One row per domain in `source_block`. Every mutation is a single
//! `INSERT ... ON CONFLICT(domain) DO UPDATE` statement so concurrent
//! collection processes never lose an increment. Timestamps are Unix
//! milliseconds.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqlitePool};

use crate::error_handling::DatabaseError;

/// Persisted block state of one domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceBlock {
    pub domain: String,
    pub blocked_at: DateTime<Utc>,
    pub blocked_until: DateTime<Utc>,
    pub consecutive_count: u32,
    pub last_status_code: Option<u16>,
    pub last_error: Option<String>,
}

#[derive(FromRow)]
struct SourceBlockRow {
    domain: String,
    blocked_at: i64,
    blocked_until: i64,
    consecutive_count: i64,
    last_status_code: Option<i64>,
    last_error: Option<String>,
}

impl From<SourceBlockRow> for SourceBlock {
    fn from(row: SourceBlockRow) -> Self {
        SourceBlock {
            domain: row.domain,
            blocked_at: from_millis(row.blocked_at),
            blocked_until: from_millis(row.blocked_until),
            consecutive_count: u32::try_from(row.consecutive_count).unwrap_or(0),
            last_status_code: row.last_status_code.and_then(|s| u16::try_from(s).ok()),
            last_error: row.last_error,
        }
    }
}

fn from_millis(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or(DateTime::UNIX_EPOCH)
}

/// Storage contract for the database-backed rate limiter.
#[async_trait]
pub trait SourceBlockRepository: Send + Sync {
    /// Whether the domain's block window is still in force.
    async fn is_blocked(&self, domain: &str) -> Result<bool, DatabaseError>;

    /// Stored end of the block window, expired or not.
    async fn blocked_until(&self, domain: &str) -> Result<Option<DateTime<Utc>>, DatabaseError>;

    /// Starts a block window and increments the consecutive count.
    async fn record_block(
        &self,
        domain: &str,
        until: DateTime<Utc>,
        status_code: Option<u16>,
        error: Option<String>,
    ) -> Result<(), DatabaseError>;

    /// Starts a block window without touching the consecutive count.
    async fn set_blocked_until(
        &self,
        domain: &str,
        until: DateTime<Utc>,
        status_code: Option<u16>,
        error: Option<String>,
    ) -> Result<(), DatabaseError>;

    async fn consecutive_count(&self, domain: &str) -> Result<u32, DatabaseError>;

    /// Resets the consecutive count to 0. The row is kept.
    async fn clear_block(&self, domain: &str) -> Result<(), DatabaseError>;

    /// Deletes rows whose window has expired and whose count is 0.
    async fn cleanup_expired(&self) -> Result<u64, DatabaseError>;

    async fn find(&self, domain: &str) -> Result<Option<SourceBlock>, DatabaseError>;
}

/// `SourceBlockRepository` over a SQLite pool.
#[derive(Debug, Clone)]
pub struct SqliteSourceBlockRepository {
    pool: SqlitePool,
}

impl SqliteSourceBlockRepository {
    /// Wraps a pool whose schema is already migrated.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Block window bounds in ms, keeping `blocked_until > blocked_at`.
    fn window(until: DateTime<Utc>) -> (i64, i64) {
        let now = Utc::now().timestamp_millis();
        (now, until.timestamp_millis().max(now + 1))
    }
}

#[async_trait]
impl SourceBlockRepository for SqliteSourceBlockRepository {
    async fn is_blocked(&self, domain: &str) -> Result<bool, DatabaseError> {
        let row: Option<(i64,)> =
            sqlx::query_as("SELECT 1 FROM source_block WHERE domain = ? AND blocked_until > ?")
                .bind(domain)
                .bind(Utc::now().timestamp_millis())
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.is_some())
    }

    async fn blocked_until(&self, domain: &str) -> Result<Option<DateTime<Utc>>, DatabaseError> {
        let row: Option<(i64,)> =
            sqlx::query_as("SELECT blocked_until FROM source_block WHERE domain = ?")
                .bind(domain)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(|(ms,)| from_millis(ms)))
    }

    async fn record_block(
        &self,
        domain: &str,
        until: DateTime<Utc>,
        status_code: Option<u16>,
        error: Option<String>,
    ) -> Result<(), DatabaseError> {
        let (blocked_at, blocked_until) = Self::window(until);
        sqlx::query(
            "INSERT INTO source_block
                 (domain, blocked_at, blocked_until, consecutive_count, last_status_code, last_error)
             VALUES (?, ?, ?, 1, ?, ?)
             ON CONFLICT(domain) DO UPDATE SET
                 blocked_at = excluded.blocked_at,
                 blocked_until = excluded.blocked_until,
                 consecutive_count = source_block.consecutive_count + 1,
                 last_status_code = excluded.last_status_code,
                 last_error = excluded.last_error",
        )
        .bind(domain)
        .bind(blocked_at)
        .bind(blocked_until)
        .bind(status_code.map(i64::from))
        .bind(error)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn set_blocked_until(
        &self,
        domain: &str,
        until: DateTime<Utc>,
        status_code: Option<u16>,
        error: Option<String>,
    ) -> Result<(), DatabaseError> {
        let (blocked_at, blocked_until) = Self::window(until);
        sqlx::query(
            "INSERT INTO source_block
                 (domain, blocked_at, blocked_until, consecutive_count, last_status_code, last_error)
             VALUES (?, ?, ?, 0, ?, ?)
             ON CONFLICT(domain) DO UPDATE SET
                 blocked_at = excluded.blocked_at,
                 blocked_until = excluded.blocked_until,
                 last_status_code = excluded.last_status_code,
                 last_error = excluded.last_error",
        )
        .bind(domain)
        .bind(blocked_at)
        .bind(blocked_until)
        .bind(status_code.map(i64::from))
        .bind(error)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn consecutive_count(&self, domain: &str) -> Result<u32, DatabaseError> {
        let row: Option<(i64,)> =
            sqlx::query_as("SELECT consecutive_count FROM source_block WHERE domain = ?")
                .bind(domain)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row
            .and_then(|(count,)| u32::try_from(count).ok())
            .unwrap_or(0))
    }

    async fn clear_block(&self, domain: &str) -> Result<(), DatabaseError> {
        sqlx::query("UPDATE source_block SET consecutive_count = 0 WHERE domain = ?")
            .bind(domain)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn cleanup_expired(&self) -> Result<u64, DatabaseError> {
        let result = sqlx::query(
            "DELETE FROM source_block WHERE blocked_until < ? AND consecutive_count = 0",
        )
        .bind(Utc::now().timestamp_millis())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn find(&self, domain: &str) -> Result<Option<SourceBlock>, DatabaseError> {
        let row: Option<SourceBlockRow> = sqlx::query_as(
            "SELECT domain, blocked_at, blocked_until, consecutive_count, last_status_code, last_error
             FROM source_block WHERE domain = ?",
        )
        .bind(domain)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(SourceBlock::from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn repository() -> SqliteSourceBlockRepository {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        crate::storage::run_migrations(&pool).await.unwrap();
        SqliteSourceBlockRepository::new(pool)
    }

    #[tokio::test]
    async fn test_unknown_domain() {
        let repo = repository().await;
        assert!(!repo.is_blocked("finance.yahoo.com").await.unwrap());
        assert_eq!(repo.blocked_until("finance.yahoo.com").await.unwrap(), None);
        assert_eq!(repo.consecutive_count("finance.yahoo.com").await.unwrap(), 0);
        assert!(repo.find("finance.yahoo.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_record_block_creates_then_increments() {
        let repo = repository().await;
        let until = Utc::now() + TimeDelta::minutes(5);
        repo.record_block("finance.yahoo.com", until, Some(403), Some("HTTP 403".into()))
            .await
            .unwrap();
        repo.record_block("finance.yahoo.com", until, None, Some("soft block".into()))
            .await
            .unwrap();

        let row = repo.find("finance.yahoo.com").await.unwrap().unwrap();
        assert_eq!(row.consecutive_count, 2);
        assert_eq!(row.last_status_code, None);
        assert_eq!(row.last_error.as_deref(), Some("soft block"));
        assert_eq!(row.blocked_until.timestamp_millis(), until.timestamp_millis());
        assert!(row.blocked_until > row.blocked_at);
        assert!(repo.is_blocked("finance.yahoo.com").await.unwrap());
    }

    #[tokio::test]
    async fn test_set_blocked_until_does_not_count() {
        let repo = repository().await;
        let until = Utc::now() + TimeDelta::seconds(120);
        repo.set_blocked_until("financialmodelingprep.com", until, Some(429), None)
            .await
            .unwrap();
        assert_eq!(repo.consecutive_count("financialmodelingprep.com").await.unwrap(), 0);
        assert!(repo.is_blocked("financialmodelingprep.com").await.unwrap());

        repo.record_block("financialmodelingprep.com", until, Some(403), None)
            .await
            .unwrap();
        repo.set_blocked_until("financialmodelingprep.com", until, Some(429), None)
            .await
            .unwrap();
        let row = repo.find("financialmodelingprep.com").await.unwrap().unwrap();
        assert_eq!(row.consecutive_count, 1);
        assert_eq!(row.last_status_code, Some(429));
    }

    #[tokio::test]
    async fn test_past_until_is_clamped_after_blocked_at() {
        let repo = repository().await;
        repo.record_block("www.reuters.com", Utc::now() - TimeDelta::hours(1), None, None)
            .await
            .unwrap();
        let row = repo.find("www.reuters.com").await.unwrap().unwrap();
        assert!(row.blocked_until > row.blocked_at);
    }

    #[tokio::test]
    async fn test_clear_block_resets_count_and_keeps_row() {
        let repo = repository().await;
        let until = Utc::now() + TimeDelta::minutes(5);
        repo.record_block("finance.yahoo.com", until, Some(403), None)
            .await
            .unwrap();
        repo.clear_block("finance.yahoo.com").await.unwrap();
        assert_eq!(repo.consecutive_count("finance.yahoo.com").await.unwrap(), 0);
        assert!(repo.find("finance.yahoo.com").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_cleanup_expired_only_removes_cleared_rows() {
        let repo = repository().await;
        let past = Utc::now() - TimeDelta::hours(1);
        let future = Utc::now() + TimeDelta::hours(1);

        // Expired and cleared
        repo.record_block("a.example", past, None, None).await.unwrap();
        repo.clear_block("a.example").await.unwrap();
        // Expired but still counting
        repo.record_block("b.example", past, None, None).await.unwrap();
        // Active and cleared
        repo.record_block("c.example", future, None, None).await.unwrap();
        repo.clear_block("c.example").await.unwrap();

        // Let the clamped 1 ms windows elapse
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;

        assert_eq!(repo.cleanup_expired().await.unwrap(), 1);
        assert!(repo.find("a.example").await.unwrap().is_none());
        assert!(repo.find("b.example").await.unwrap().is_some());
        assert!(repo.find("c.example").await.unwrap().is_some());
    }
}
