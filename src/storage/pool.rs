//! Database connection pool management.
//!
//! This module initializes and configures the SQLite connection pool with:
//! - WAL mode enabled for concurrent collection processes
//! - A busy timeout so writers from other processes queue instead of failing
//! - A bounded number of connections per process
//! - Automatic creation of the database file and its parent directory

use std::fs;
use std::path::Path;

use log::{error, info};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;

use crate::config::{DB_BUSY_TIMEOUT, DB_MAX_CONNECTIONS};
use crate::error_handling::DatabaseError;

/// Opens (creating if needed) the SQLite database at `db_path`.
///
/// Enables WAL mode so several processes can share the block table.
pub async fn init_db_pool_with_path(db_path: &Path) -> Result<SqlitePool, DatabaseError> {
    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| {
            error!("Failed to create database directory {}: {e}", parent.display());
            DatabaseError::FileCreationError(e.to_string())
        })?;
    }

    let created = !db_path.exists();
    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(DB_BUSY_TIMEOUT);

    let pool = SqlitePoolOptions::new()
        .max_connections(DB_MAX_CONNECTIONS)
        .connect_with(options)
        .await
        .map_err(|e| {
            error!("Failed to connect to database {}: {e}", db_path.display());
            DatabaseError::SqlError(e)
        })?;

    if created {
        info!("Database file created at {}", db_path.display());
    }
    Ok(pool)
}
