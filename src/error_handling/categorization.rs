//! Error categorization.
//!
//! Maps reqwest failures onto `TransportErrorKind` and `fetch()` outcomes onto
//! `FetchOutcome` so both can be counted and logged consistently.

use super::stats::FetchOutcome;
use super::types::{FetchError, TransportErrorKind};

/// Categorizes a `reqwest::Error` into a `TransportErrorKind`.
///
/// Status errors never reach this function: the transport disables
/// `error_for_status`, so every HTTP status is handled by the orchestrator.
pub fn categorize_reqwest_error(error: &reqwest::Error) -> TransportErrorKind {
    if error.is_builder() {
        TransportErrorKind::Builder
    } else if error.is_redirect() {
        TransportErrorKind::Redirect
    } else if error.is_timeout() {
        TransportErrorKind::Timeout
    } else if error.is_connect() {
        TransportErrorKind::Connect
    } else if error.is_request() {
        TransportErrorKind::Request
    } else if error.is_body() {
        TransportErrorKind::Body
    } else if error.is_decode() {
        TransportErrorKind::Decode
    } else {
        TransportErrorKind::Other
    }
}

/// Classifies a finished `fetch()` for statistics.
pub fn categorize_fetch_result<T>(result: &Result<T, FetchError>) -> FetchOutcome {
    match result {
        Ok(_) => FetchOutcome::Success,
        Err(FetchError::Network { .. }) => FetchOutcome::NetworkError,
        Err(FetchError::RateLimited { .. }) => FetchOutcome::RateLimited,
        Err(FetchError::Blocked {
            retry_until: Some(_),
            ..
        }) => FetchOutcome::Blocked,
        Err(FetchError::Blocked {
            retry_until: None, ..
        }) => FetchOutcome::BlockedPermanently,
        Err(FetchError::Storage(_)) => FetchOutcome::StorageError,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error_handling::types::{BlockCause, NetworkErrorKind};
    use crate::BlockReason;
    use chrono::Utc;

    #[tokio::test]
    async fn test_categorize_connect_error() {
        // Port 9 (discard) on localhost is almost never listening
        let client = reqwest::Client::new();
        let err = client
            .get("http://127.0.0.1:9/")
            .timeout(std::time::Duration::from_secs(2))
            .send()
            .await
            .expect_err("request to a closed port should fail");
        let kind = categorize_reqwest_error(&err);
        assert!(
            matches!(kind, TransportErrorKind::Connect | TransportErrorKind::Timeout),
            "unexpected kind {:?}",
            kind
        );
    }

    #[test]
    fn test_categorize_builder_error() {
        let client = reqwest::Client::new();
        let err = client
            .get("not a url")
            .build()
            .expect_err("invalid URL should fail to build");
        assert_eq!(categorize_reqwest_error(&err), TransportErrorKind::Builder);
    }

    #[test]
    fn test_categorize_fetch_results() {
        let ok: Result<(), FetchError> = Ok(());
        assert_eq!(categorize_fetch_result(&ok), FetchOutcome::Success);

        let network: Result<(), FetchError> = Err(FetchError::network(
            NetworkErrorKind::Ssrf,
            "https://internal.example/",
        ));
        assert_eq!(categorize_fetch_result(&network), FetchOutcome::NetworkError);

        let limited: Result<(), FetchError> = Err(FetchError::RateLimited {
            domain: "finance.yahoo.com".into(),
            retry_at: None,
        });
        assert_eq!(categorize_fetch_result(&limited), FetchOutcome::RateLimited);

        let blocked: Result<(), FetchError> = Err(FetchError::Blocked {
            domain: "finance.yahoo.com".into(),
            url: "https://finance.yahoo.com/".into(),
            retry_until: Some(Utc::now()),
            cause: BlockCause::HttpStatus(403),
        });
        assert_eq!(categorize_fetch_result(&blocked), FetchOutcome::Blocked);

        let permanent: Result<(), FetchError> = Err(FetchError::Blocked {
            domain: "finance.yahoo.com".into(),
            url: "https://finance.yahoo.com/".into(),
            retry_until: None,
            cause: BlockCause::SoftBlock(BlockReason::GeoBlocked),
        });
        assert_eq!(
            categorize_fetch_result(&permanent),
            FetchOutcome::BlockedPermanently
        );
    }
}
