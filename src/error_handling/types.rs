//! Error type definitions.
//!
//! This module defines the tagged error returned by `fetch()` and the errors
//! raised while initializing resources or talking to a rate-limit backing store.

use chrono::{DateTime, Utc};
use log::SetLoggerError;
use reqwest::Error as ReqwestError;
use strum_macros::EnumIter as EnumIterMacro;
use thiserror::Error;

use crate::block_detection::BlockReason;

/// Error types for initialization failures.
#[derive(Error, Debug)]
#[allow(clippy::enum_variant_names)] // All variants end with "Error" by convention
pub enum InitializationError {
    /// Error initializing the logger.
    #[error("Logger initialization error: {0}")]
    LoggerError(#[from] SetLoggerError),

    /// Error initializing the HTTP client.
    #[error("HTTP client initialization error: {0}")]
    HttpClientError(#[from] ReqwestError),

    /// Error opening the rate limiter backing store.
    #[error("Rate limiter initialization error: {0}")]
    RateLimiterError(#[from] RateLimitStoreError),
}

/// Error types for database operations.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Error creating the database file or its parent directory.
    #[error("Database file creation error: {0}")]
    FileCreationError(String),

    /// SQL execution error.
    #[error("SQL error: {0}")]
    SqlError(#[from] sqlx::Error),

    /// Schema migration error.
    #[error("Migration error: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),
}

/// Failure of a rate limiter backing store.
#[derive(Error, Debug)]
pub enum RateLimitStoreError {
    /// The database backend failed.
    #[error("Rate limit database error: {0}")]
    Database(#[from] DatabaseError),

    /// The state file could not be read or written.
    #[error("Rate limit state file error ({path}): {source}")]
    Io {
        /// State file path
        path: String,
        /// Underlying I/O failure
        #[source]
        source: std::io::Error,
    },
}

impl From<sqlx::Error> for RateLimitStoreError {
    fn from(e: sqlx::Error) -> Self {
        RateLimitStoreError::Database(DatabaseError::SqlError(e))
    }
}

/// Why a URL was rejected before, during, or after a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIterMacro)]
pub enum NetworkErrorKind {
    /// The URL could not be parsed.
    InvalidUrl,
    /// The scheme is not `http` or `https`.
    SchemeNotAllowed,
    /// The URL has no host.
    MissingHost,
    /// The host is not on the allowlist.
    DomainNotAllowed,
    /// The host resolves to a private, loopback, or link-local address.
    Ssrf,
    /// The redirect chain exceeded the configured hop limit.
    TooManyRedirects,
    /// The transport failed and the attempt budget is exhausted.
    Transport,
}

impl NetworkErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NetworkErrorKind::InvalidUrl => "Invalid URL",
            NetworkErrorKind::SchemeNotAllowed => "URL scheme must be http or https",
            NetworkErrorKind::MissingHost => "URL missing host",
            NetworkErrorKind::DomainNotAllowed => "Domain not in allowlist",
            NetworkErrorKind::Ssrf => "SSRF protection: host resolves to a private address",
            NetworkErrorKind::TooManyRedirects => "Too many redirects",
            NetworkErrorKind::Transport => "Request failed",
        }
    }
}

impl std::fmt::Display for NetworkErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Category of a transport-level (reqwest) failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIterMacro)]
pub enum TransportErrorKind {
    Builder,
    Redirect,
    Timeout,
    Request,
    Connect,
    Body,
    Decode,
    Other,
}

impl TransportErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransportErrorKind::Builder => "HTTP request builder error",
            TransportErrorKind::Redirect => "HTTP request redirect error",
            TransportErrorKind::Timeout => "HTTP request timeout error",
            TransportErrorKind::Request => "HTTP request error",
            TransportErrorKind::Connect => "HTTP request connect error",
            TransportErrorKind::Body => "HTTP request body error",
            TransportErrorKind::Decode => "HTTP request decode error",
            TransportErrorKind::Other => "HTTP request other error",
        }
    }
}

impl std::fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single HTTP attempt failed.
#[derive(Error, Debug)]
pub enum TransportError {
    /// reqwest reported a failure (timeout, refused connection, DNS, body read).
    #[error("{kind}: {source}")]
    Http {
        /// Categorized failure
        kind: TransportErrorKind,
        /// Underlying reqwest error
        #[source]
        source: ReqwestError,
    },

    /// The origin kept answering with a server error.
    #[error("server responded with HTTP {status}")]
    ServerStatus {
        /// Last HTTP status received
        status: u16,
    },

    /// Connection-level failure reported without a reqwest error.
    #[error("connection failed: {0}")]
    Connection(String),
}

impl TransportError {
    /// Category of this failure.
    pub fn kind(&self) -> TransportErrorKind {
        match self {
            TransportError::Http { kind, .. } => *kind,
            TransportError::ServerStatus { .. } => TransportErrorKind::Other,
            TransportError::Connection(_) => TransportErrorKind::Connect,
        }
    }
}

impl From<ReqwestError> for TransportError {
    fn from(e: ReqwestError) -> Self {
        TransportError::Http {
            kind: super::categorize_reqwest_error(&e),
            source: e,
        }
    }
}

/// What triggered a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockCause {
    /// The origin answered 401, 403, or 429.
    HttpStatus(u16),
    /// The body matched a soft-block signature.
    SoftBlock(BlockReason),
}

impl BlockCause {
    /// HTTP status to persist alongside the block, if the cause has one.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            BlockCause::HttpStatus(status) => Some(*status),
            BlockCause::SoftBlock(_) => None,
        }
    }
}

impl std::fmt::Display for BlockCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BlockCause::HttpStatus(status) => write!(f, "HTTP {}", status),
            BlockCause::SoftBlock(reason) => write!(f, "soft block ({})", reason.as_ref()),
        }
    }
}

/// Outcome of a failed `fetch()`.
///
/// Callers pattern-match on the variant: `Network` is fatal for this source,
/// `RateLimited` carries the time to come back, and `Blocked` carries either a
/// cool-down deadline or `None` (escalate, do not auto-retry). Every `url`
/// payload has credentials stripped.
#[derive(Error, Debug)]
pub enum FetchError {
    /// Malformed or disallowed URL, SSRF rejection, or transport failure after retries.
    #[error("{kind}: {url}")]
    Network {
        /// Why the fetch was rejected
        kind: NetworkErrorKind,
        /// Sanitized URL
        url: String,
        /// Final transport failure, for `NetworkErrorKind::Transport`
        #[source]
        source: Option<TransportError>,
    },

    /// The domain is inside a rate-limit window.
    #[error("Domain {domain} is rate limited{}", retry_suffix(.retry_at))]
    RateLimited {
        /// Rate-limited host
        domain: String,
        /// When the window ends, if known
        retry_at: Option<DateTime<Utc>>,
    },

    /// Hard block (401/403) or a soft block classified as blocking.
    #[error("Blocked by {domain} ({cause}): {url}{}", retry_suffix(.retry_until))]
    Blocked {
        /// Blocking host
        domain: String,
        /// Sanitized URL that was blocked
        url: String,
        /// Cool-down deadline, `None` when the block is not recoverable
        retry_until: Option<DateTime<Utc>>,
        /// What triggered the block
        cause: BlockCause,
    },

    /// The rate limiter backing store failed.
    #[error(transparent)]
    Storage(#[from] RateLimitStoreError),
}

fn retry_suffix(at: &Option<DateTime<Utc>>) -> String {
    match at {
        Some(at) => format!(" until {}", at.to_rfc3339()),
        None => String::new(),
    }
}

impl FetchError {
    /// Builds a `Network` error without a transport cause.
    pub fn network(kind: NetworkErrorKind, url: &str) -> Self {
        FetchError::Network {
            kind,
            url: crate::sanitize::sanitize(url),
            source: None,
        }
    }

    /// Builds a `Network` error wrapping the final transport failure.
    pub fn transport(url: &str, source: TransportError) -> Self {
        FetchError::Network {
            kind: NetworkErrorKind::Transport,
            url: crate::sanitize::sanitize(url),
            source: Some(source),
        }
    }

    /// Returns the network error kind, if this is a `Network` error.
    pub fn network_kind(&self) -> Option<NetworkErrorKind> {
        match self {
            FetchError::Network { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// Time after which the caller may try the domain again, when one is known.
    pub fn retry_at(&self) -> Option<DateTime<Utc>> {
        match self {
            FetchError::RateLimited { retry_at, .. } => *retry_at,
            FetchError::Blocked { retry_until, .. } => *retry_until,
            _ => None,
        }
    }
}
