//! Configuration types.
//!
//! This module defines the library configuration (`FetchConfig`), the per-domain
//! pacing table, and the enums shared with the command-line front end.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use clap::ValueEnum;

use crate::config::constants::{
    BLOCK_BACKOFF_SECS, CACHED_PROVIDER_DOMAIN, DEFAULT_CONNECT_TIMEOUT_SECS,
    DEFAULT_MIN_INTERVAL_MS, DEFAULT_RATE_LIMIT_WINDOW_SECS, DEFAULT_REQUEST_TIMEOUT_SECS,
    DEFAULT_STATE_DIR, DOMAIN_MIN_INTERVALS_MS, MAX_REDIRECT_HOPS, RETRY_MAX_ATTEMPTS,
};

/// Logging level for the application.
///
/// Controls the verbosity of log output, from most restrictive (Error) to most
/// verbose (Trace).
#[derive(Clone, Debug, ValueEnum)]
pub enum LogLevel {
    /// Only error messages
    Error,
    /// Error and warning messages
    Warn,
    /// Error, warning, and informational messages
    Info,
    /// All messages except trace
    Debug,
    /// All messages including trace
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(l: LogLevel) -> Self {
        match l {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Log output format.
///
/// - `Plain`: Human-readable format with colors (default)
/// - `Json`: Structured JSON format for machine parsing
#[derive(Clone, Debug, ValueEnum)]
pub enum LogFormat {
    /// Human-readable format with colors (default)
    Plain,
    /// Structured JSON format for machine parsing
    Json,
}

/// Where the rate limiter keeps per-domain block state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum StateBackend {
    /// JSON file in a storage directory. Single process only; meant for development.
    File,
    /// SQLite table with atomic upserts. Safe for concurrent collection processes.
    Sqlite,
}

/// Minimum inter-request interval per domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacingTable {
    default_interval: Duration,
    per_domain: HashMap<String, Duration>,
}

impl PacingTable {
    /// Creates a table where every domain uses `default_interval`.
    pub fn new(default_interval: Duration) -> Self {
        Self {
            default_interval,
            per_domain: HashMap::new(),
        }
    }

    /// Sets the interval for one domain (exact host match).
    pub fn with_domain(mut self, domain: impl Into<String>, interval: Duration) -> Self {
        self.per_domain
            .insert(domain.into().to_ascii_lowercase(), interval);
        self
    }

    /// Returns the minimum interval between two requests to `domain`.
    pub fn interval_for(&self, domain: &str) -> Duration {
        self.per_domain
            .get(&domain.to_ascii_lowercase())
            .copied()
            .unwrap_or(self.default_interval)
    }

    /// Interval used for domains without an explicit entry.
    pub fn default_interval(&self) -> Duration {
        self.default_interval
    }
}

impl Default for PacingTable {
    fn default() -> Self {
        DOMAIN_MIN_INTERVALS_MS.iter().fold(
            PacingTable::new(Duration::from_millis(DEFAULT_MIN_INTERVAL_MS)),
            |table, (domain, ms)| table.with_domain(*domain, Duration::from_millis(*ms)),
        )
    }
}

/// Library configuration (no CLI dependencies).
///
/// # Examples
///
/// ```
/// use source_fetch::FetchConfig;
///
/// let config = FetchConfig {
///     allowed_domains: vec!["finance.yahoo.com".to_string()],
///     ..Default::default()
/// };
/// assert_eq!(config.max_attempts, 3);
/// ```
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Hostnames permitted as fetch targets (exact match).
    pub allowed_domains: Vec<String>,

    /// Minimum inter-request interval per domain.
    pub pacing: PacingTable,

    /// Block backoff durations indexed by consecutive block count (clamped at the last entry).
    pub backoff_table: Vec<Duration>,

    /// Maximum HTTP attempts per fetch (initial attempt included).
    pub max_attempts: u32,

    /// Default per-request timeout.
    pub request_timeout: Duration,

    /// TCP connect timeout.
    pub connect_timeout: Duration,

    /// Maximum redirect hops followed per attempt.
    pub max_redirect_hops: usize,

    /// Block window for a 429 without a usable `Retry-After` header.
    pub default_rate_limit_window: Duration,

    /// Provider domain whose responses are cached for the run (`None` disables caching).
    pub cached_provider_domain: Option<String>,

    /// Rate limiter backing store.
    pub state_backend: StateBackend,

    /// Storage directory (file backend) or database file (SQLite backend).
    pub state_path: PathBuf,
}

impl FetchConfig {
    /// Returns the block backoff for a domain that already has `consecutive_blocks` blocks.
    pub fn block_backoff(&self, consecutive_blocks: u32) -> Duration {
        crate::fetch::block_backoff(&self.backoff_table, consecutive_blocks)
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            allowed_domains: Vec::new(),
            pacing: PacingTable::default(),
            backoff_table: BLOCK_BACKOFF_SECS
                .iter()
                .map(|secs| Duration::from_secs(*secs))
                .collect(),
            max_attempts: RETRY_MAX_ATTEMPTS,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            max_redirect_hops: MAX_REDIRECT_HOPS,
            default_rate_limit_window: Duration::from_secs(DEFAULT_RATE_LIMIT_WINDOW_SECS),
            cached_provider_domain: Some(CACHED_PROVIDER_DOMAIN.to_string()),
            state_backend: StateBackend::File,
            state_path: PathBuf::from(DEFAULT_STATE_DIR),
        }
    }
}
