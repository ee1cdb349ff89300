//! SQLite persistence for per-domain block state.
//!
//! This module provides:
//! - Pool creation with WAL mode (`init_db_pool_with_path`)
//! - Embedded schema migrations (`run_migrations`)
//! - The `SourceBlockRepository` contract and its SQLite implementation

pub mod migrations;
pub mod pool;
mod source_block;

pub use migrations::run_migrations;
pub use pool::init_db_pool_with_path;
pub use source_block::{SourceBlock, SourceBlockRepository, SqliteSourceBlockRepository};
