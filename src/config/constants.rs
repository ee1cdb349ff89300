//! Configuration constants.
//!
//! This module defines the defaults used throughout the fetch subsystem,
//! including timeouts, pacing intervals, and backoff durations.

use std::time::Duration;

/// Default per-request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
/// TCP connection timeout in seconds (capped by the request timeout).
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Maximum number of HTTP attempts per `fetch()` call (initial attempt + retries).
pub const RETRY_MAX_ATTEMPTS: u32 = 3;
/// Lower bound for the transient-failure backoff sleep in milliseconds.
pub const RETRY_MIN_DELAY_MS: u64 = 100;
/// Jitter applied to the transient-failure backoff, in milliseconds (symmetric).
pub const RETRY_JITTER_MS: i64 = 100;

/// Backoff durations applied after consecutive hard or soft blocks, indexed by
/// the number of blocks already recorded for the domain.
/// Counts beyond the table length use the last entry.
pub const BLOCK_BACKOFF_SECS: [u64; 4] = [300, 900, 3600, 21600];

/// Block window used for a 429 response whose `Retry-After` is missing or unparseable.
pub const DEFAULT_RATE_LIMIT_WINDOW_SECS: u64 = 60;

// Redirect handling
/// Maximum number of redirect hops to follow
/// Prevents infinite redirect loops and excessive request chains
pub const MAX_REDIRECT_HOPS: usize = 10;

// Per-domain pacing
/// Minimum delay between requests to a domain with no explicit entry.
pub const DEFAULT_MIN_INTERVAL_MS: u64 = 1000;

/// Known slow upstreams and their minimum inter-request delay in milliseconds.
pub const DOMAIN_MIN_INTERVALS_MS: &[(&str, u64)] = &[
    ("finance.yahoo.com", 2000),
    ("query1.finance.yahoo.com", 2500),
    ("www.reuters.com", 3000),
    // Free tier allows 300 req/min; stay well below it
    ("financialmodelingprep.com", 3000),
];

/// Provider whose API responses are deduplicated within a collection run.
pub const CACHED_PROVIDER_DOMAIN: &str = "financialmodelingprep.com";

/// Query parameters that carry credentials and must never be logged or persisted.
pub const SENSITIVE_QUERY_KEYS: &[&str] = &["apikey", "api_key"];

/// File name of the file-backed rate limiter state inside its storage directory.
pub const RATE_LIMIT_STATE_FILE: &str = "ratelimit.json";
/// Default storage directory for the file-backed rate limiter.
pub const DEFAULT_STATE_DIR: &str = "./runtime";
/// Default SQLite database path for the database-backed rate limiter.
pub const DEFAULT_DB_PATH: &str = "./source_fetch.db";
/// Connections per process in the SQLite pool.
pub const DB_MAX_CONNECTIONS: u32 = 5;
/// How long a writer waits on another process's lock before failing with `SQLITE_BUSY`.
pub const DB_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Content type assumed when a response carries no `Content-Type` header.
pub const DEFAULT_CONTENT_TYPE: &str = "text/html";

/// Default User-Agent string for HTTP requests.
///
/// Used when the random pool is bypassed (`--user-agent`) and as the first
/// entry of the random pool.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

/// Timeout for outbound alert webhooks.
pub const ALERT_WEBHOOK_TIMEOUT: Duration = Duration::from_secs(5);

// HTTP status codes (for clarity and consistency)
pub const HTTP_STATUS_UNAUTHORIZED: u16 = 401;
pub const HTTP_STATUS_FORBIDDEN: u16 = 403;
pub const HTTP_STATUS_TOO_MANY_REQUESTS: u16 = 429;
pub const HTTP_STATUS_SERVICE_UNAVAILABLE: u16 = 503;
