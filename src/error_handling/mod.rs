//! Error handling and fetch statistics.
//!
//! This module provides:
//! - The tagged `FetchError` returned by `fetch()`
//! - Initialization, database, and rate-limit store errors
//! - Categorization of reqwest failures and fetch outcomes
//! - Thread-safe outcome counters

mod categorization;
mod stats;
mod types;

// Re-export public API
pub use categorization::{categorize_fetch_result, categorize_reqwest_error};
pub use stats::{FetchOutcome, FetchStats};
pub use types::{
    BlockCause, DatabaseError, FetchError, InitializationError, NetworkErrorKind,
    RateLimitStoreError, TransportError, TransportErrorKind,
};

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use strum::IntoEnumIterator;

    #[test]
    fn test_fetch_stats_initialization() {
        let stats = FetchStats::new();
        for outcome in FetchOutcome::iter() {
            assert_eq!(stats.get(outcome), 0);
        }
        assert_eq!(stats.total(), 0);
        assert_eq!(stats.attempts(), 0);
    }

    #[test]
    fn test_fetch_stats_increment() {
        let stats = FetchStats::new();
        stats.increment(FetchOutcome::Success);
        stats.increment(FetchOutcome::Success);
        stats.increment(FetchOutcome::Blocked);
        stats.increment_attempts();
        assert_eq!(stats.get(FetchOutcome::Success), 2);
        assert_eq!(stats.get(FetchOutcome::Blocked), 1);
        assert_eq!(stats.total(), 3);
        assert_eq!(stats.attempts(), 1);
    }

    #[test]
    fn test_network_error_sanitizes_url() {
        let err = FetchError::network(
            NetworkErrorKind::DomainNotAllowed,
            "https://evil.example/data?apikey=SECRET&symbol=XOM",
        );
        let message = err.to_string();
        assert!(!message.contains("SECRET"), "{}", message);
        assert!(message.contains("symbol=XOM"));
        assert_eq!(err.network_kind(), Some(NetworkErrorKind::DomainNotAllowed));
    }

    #[test]
    fn test_transport_error_sanitizes_url_and_keeps_source() {
        let err = FetchError::transport(
            "https://api.eia.gov/v2/series?api_key=SECRET",
            TransportError::ServerStatus { status: 500 },
        );
        assert!(!err.to_string().contains("SECRET"));
        let source = std::error::Error::source(&err).expect("source should be kept");
        assert_eq!(source.to_string(), "server responded with HTTP 500");
    }

    #[test]
    fn test_rate_limited_message_includes_retry_time() {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 2, 0).unwrap();
        let err = FetchError::RateLimited {
            domain: "finance.yahoo.com".into(),
            retry_at: Some(at),
        };
        assert_eq!(
            err.to_string(),
            "Domain finance.yahoo.com is rate limited until 2024-01-01T00:02:00+00:00"
        );
        assert_eq!(err.retry_at(), Some(at));
    }

    #[test]
    fn test_block_cause_status_code() {
        assert_eq!(BlockCause::HttpStatus(403).status_code(), Some(403));
        assert_eq!(
            BlockCause::SoftBlock(crate::BlockReason::Captcha).status_code(),
            None
        );
    }

    #[test]
    fn test_network_error_kind_display() {
        for kind in NetworkErrorKind::iter() {
            assert!(!kind.to_string().is_empty());
        }
        for kind in TransportErrorKind::iter() {
            assert!(!kind.to_string().is_empty());
        }
    }
}
