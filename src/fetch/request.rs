//! Fetch request description.

use std::time::Duration;

use crate::config::DEFAULT_REQUEST_TIMEOUT_SECS;

/// What to fetch and how. Built by the caller per attempt; never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    /// Target URL
    pub url: String,
    /// Extra request headers (applied after the User-Agent, so they can override it)
    pub headers: Vec<(String, String)>,
    /// Per-request timeout
    pub timeout: Duration,
    /// Follow `Location` redirects (each hop is checked against the allowlist)
    pub follow_redirects: bool,
    /// Fixed User-Agent; `None` picks one from the provider per attempt
    pub user_agent: Option<String>,
}

impl FetchRequest {
    /// Creates a GET request with the default timeout that follows redirects.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: Vec::new(),
            timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            follow_redirects: true,
            user_agent: None,
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn without_redirects(mut self) -> Self {
        self.follow_redirects = false;
        self
    }
}
