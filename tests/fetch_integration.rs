//! End-to-end fetch tests against a local HTTP server.
//!
//! These tests drive the real reqwest transport and file-backed rate limiter
//! through the orchestrator:
//! - Success, redirects, and credential stripping
//! - 403 and soft blocks persisted across fetches
//! - 429 windows from `Retry-After`
//! - Retry budget on server errors

mod helpers;

use std::sync::Arc;

use chrono::{TimeDelta, Utc};
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use helpers::{local_orchestrator, AlertSink};
use source_fetch::rate_limiter::RateLimiter;
use source_fetch::{
    BlockCause, BlockReason, FetchError, FetchRequest, FileRateLimiter, NetworkErrorKind,
    PacingTable, TransportError,
};

fn file_limiter(dir: &TempDir) -> Arc<FileRateLimiter> {
    Arc::new(
        FileRateLimiter::open(dir.path(), PacingTable::new(std::time::Duration::ZERO))
            .expect("Failed to open rate limiter"),
    )
}

#[tokio::test]
async fn test_fetch_success_strips_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/stable/quote"))
        .and(query_param("apikey", "SECRET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(r#"[{"symbol":"XOM","price":118.2}]"#, "application/json"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let orchestrator = local_orchestrator(file_limiter(&dir), Arc::new(AlertSink::default()));
    let url = format!("{}/stable/quote?symbol=XOM&apikey=SECRET", server.uri());

    let result = orchestrator.fetch(&FetchRequest::new(&url)).await.unwrap();

    assert_eq!(result.status_code, 200);
    assert!(result.is_json());
    assert_eq!(result.url, format!("{}/stable/quote?symbol=XOM", server.uri()));
    assert!(result.text().contains("XOM"));
    assert_eq!(result.header("content-type"), Some("application/json"));
}

#[tokio::test]
async fn test_fetch_sends_user_agent_and_headers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let orchestrator = local_orchestrator(file_limiter(&dir), Arc::new(AlertSink::default()));
    let request = FetchRequest::new(format!("{}/page", server.uri()))
        .with_user_agent("SourceFetchTest/1.0")
        .with_header("Accept-Language", "en-US");
    orchestrator.fetch(&request).await.unwrap();

    let received = server.received_requests().await.unwrap();
    assert_eq!(received.len(), 1);
    let headers = &received[0].headers;
    assert_eq!(
        headers.get("user-agent").and_then(|v| v.to_str().ok()),
        Some("SourceFetchTest/1.0")
    );
    assert_eq!(
        headers.get("accept-language").and_then(|v| v.to_str().ok()),
        Some("en-US")
    );
}

#[tokio::test]
async fn test_fetch_follows_local_redirect() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/old"))
        .respond_with(ResponseTemplate::new(301).insert_header("location", "/new"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/new"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("<html>moved</html>", "text/html"))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let orchestrator = local_orchestrator(file_limiter(&dir), Arc::new(AlertSink::default()));

    let result = orchestrator
        .fetch(&FetchRequest::new(format!("{}/old", server.uri())))
        .await
        .unwrap();

    assert_eq!(result.final_url, format!("{}/new", server.uri()));
    assert!(result.was_redirected());
    assert_eq!(result.content_type, "text/html");
}

#[tokio::test]
async fn test_redirect_off_allowlist_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(302).insert_header("location", "http://169.254.169.254/latest/"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let orchestrator = local_orchestrator(file_limiter(&dir), Arc::new(AlertSink::default()));

    let err = orchestrator
        .fetch(&FetchRequest::new(format!("{}/start", server.uri())))
        .await
        .unwrap_err();
    assert_eq!(err.network_kind(), Some(NetworkErrorKind::DomainNotAllowed));
}

#[tokio::test]
async fn test_forbidden_blocks_domain_for_later_fetches() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(403).set_body_string("Forbidden"))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let limiter = file_limiter(&dir);
    let alerts = Arc::new(AlertSink::default());
    let orchestrator = local_orchestrator(limiter.clone(), alerts.clone());
    let url = format!("{}/quote/AAPL", server.uri());
    let before = Utc::now();

    match orchestrator.fetch(&FetchRequest::new(&url)).await {
        Err(FetchError::Blocked {
            domain,
            retry_until,
            cause,
            ..
        }) => {
            assert_eq!(domain, "127.0.0.1");
            assert_eq!(cause, BlockCause::HttpStatus(403));
            let until = retry_until.unwrap();
            assert!(until >= before + TimeDelta::seconds(299));
            assert!(until <= Utc::now() + TimeDelta::seconds(301));
        }
        other => panic!("expected Blocked, got {:?}", other),
    }
    assert_eq!(alerts.events().len(), 1);
    assert_eq!(limiter.consecutive_block_count("127.0.0.1").await.unwrap(), 1);

    // Second fetch fails fast without reaching the server
    let err = orchestrator.fetch(&FetchRequest::new(&url)).await.unwrap_err();
    assert!(matches!(err, FetchError::RateLimited { .. }));

    // A fresh limiter over the same directory sees the block
    let reopened = file_limiter(&dir);
    assert!(reopened.is_rate_limited("127.0.0.1").await.unwrap());
}

#[tokio::test]
async fn test_too_many_requests_honours_retry_after() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "120"))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let limiter = file_limiter(&dir);
    let orchestrator = local_orchestrator(limiter.clone(), Arc::new(AlertSink::default()));
    let before = Utc::now();

    let err = orchestrator
        .fetch(&FetchRequest::new(format!("{}/", server.uri())))
        .await
        .unwrap_err();

    let retry_at = err.retry_at().unwrap();
    assert!(retry_at >= before + TimeDelta::seconds(119));
    assert!(retry_at <= Utc::now() + TimeDelta::seconds(121));
    assert!(orchestrator.is_rate_limited("127.0.0.1").await.unwrap());
    assert_eq!(limiter.consecutive_block_count("127.0.0.1").await.unwrap(), 0);
}

#[tokio::test]
async fn test_captcha_page_is_a_soft_block() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(
                "<html><body><div class=\"g-recaptcha\" data-sitekey=\"x\"></div></body></html>",
                "text/html; charset=utf-8",
            ),
        )
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let limiter = file_limiter(&dir);
    let orchestrator = local_orchestrator(limiter.clone(), Arc::new(AlertSink::default()));

    let err = orchestrator
        .fetch(&FetchRequest::new(format!("{}/quote", server.uri())))
        .await
        .unwrap_err();

    match err {
        FetchError::Blocked {
            cause, retry_until, ..
        } => {
            assert_eq!(cause, BlockCause::SoftBlock(BlockReason::Captcha));
            assert!(retry_until.is_some());
        }
        other => panic!("expected Blocked, got {:?}", other),
    }
    assert_eq!(limiter.consecutive_block_count("127.0.0.1").await.unwrap(), 1);
}

#[tokio::test]
async fn test_server_errors_use_full_attempt_budget() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let orchestrator = local_orchestrator(file_limiter(&dir), Arc::new(AlertSink::default()));

    let err = orchestrator
        .fetch(&FetchRequest::new(format!("{}/flaky", server.uri())))
        .await
        .unwrap_err();

    match err {
        FetchError::Network {
            kind: NetworkErrorKind::Transport,
            source: Some(TransportError::ServerStatus { status }),
            ..
        } => assert_eq!(status, 500),
        other => panic!("expected transport error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_success_resets_block_count() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("fine"))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let limiter = file_limiter(&dir);
    // An expired block with a count of 2
    limiter
        .record_block(
            "127.0.0.1",
            Utc::now() - TimeDelta::seconds(1),
            &BlockCause::HttpStatus(403),
        )
        .await
        .unwrap();
    limiter
        .record_block(
            "127.0.0.1",
            Utc::now() - TimeDelta::seconds(1),
            &BlockCause::HttpStatus(403),
        )
        .await
        .unwrap();
    assert_eq!(limiter.consecutive_block_count("127.0.0.1").await.unwrap(), 2);

    let orchestrator = local_orchestrator(limiter.clone(), Arc::new(AlertSink::default()));
    orchestrator
        .fetch(&FetchRequest::new(format!("{}/", server.uri())))
        .await
        .unwrap();

    assert_eq!(limiter.consecutive_block_count("127.0.0.1").await.unwrap(), 0);
}
