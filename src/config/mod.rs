//! Application configuration and constants.
//!
//! This module provides:
//! - Configuration constants (timeouts, pacing intervals, backoff table)
//! - The library configuration struct and pacing table
//! - CLI option parsing for the binary

mod cli;
mod constants;
mod types;

// Re-export all constants
pub use cli::Cli;
pub use constants::*;
pub use types::{FetchConfig, LogFormat, LogLevel, PacingTable, StateBackend};
