//! Single-hop HTTP transport.
//!
//! The transport never follows redirects itself; the orchestrator walks the
//! redirect chain so every hop passes the domain policy.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, LOCATION, USER_AGENT};
use url::Url;

use crate::error_handling::TransportError;

/// One outbound GET.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub url: Url,
    pub user_agent: String,
    pub headers: Vec<(String, String)>,
    pub timeout: Duration,
}

/// Status, headers, and body of one HTTP response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    /// Lower-cased header names in arrival order, each with all its values
    pub headers: Vec<(String, Vec<String>)>,
    pub body: Vec<u8>,
}

impl RawResponse {
    /// First value of the named header (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .and_then(|(_, values)| values.first())
            .map(String::as_str)
    }

    /// `Location` target of a 301/302/303/307/308 response.
    pub fn redirect_location(&self) -> Option<&str> {
        if matches!(self.status, 301 | 302 | 303 | 307 | 308) {
            self.header(LOCATION.as_str())
        } else {
            None
        }
    }
}

/// Sends a single request and reads the full body.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: &TransportRequest) -> Result<RawResponse, TransportError>;
}

/// `reqwest`-backed transport.
///
/// The client must have redirects disabled; see
/// `initialization::init_client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: &TransportRequest) -> Result<RawResponse, TransportError> {
        let mut builder = self
            .client
            .get(request.url.as_str())
            .timeout(request.timeout)
            .header(USER_AGENT, request.user_agent.as_str());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let headers = group_headers(response.headers());
        let body = response.bytes().await?.to_vec();

        Ok(RawResponse {
            status,
            headers,
            body,
        })
    }
}

fn group_headers(map: &HeaderMap) -> Vec<(String, Vec<String>)> {
    let mut grouped: Vec<(String, Vec<String>)> = Vec::new();
    for (name, value) in map {
        let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
        match grouped.iter_mut().find(|(n, _)| n == name.as_str()) {
            Some((_, values)) => values.push(value),
            None => grouped.push((name.as_str().to_string(), vec![value])),
        }
    }
    grouped
}
