//! HTTP client initialization.

use std::sync::Arc;

use reqwest::ClientBuilder;

use crate::config::FetchConfig;
use crate::security::SafeResolver;

/// Initializes the HTTP client used by `ReqwestTransport`.
///
/// Creates a `reqwest::Client` configured with:
/// - Redirects disabled (the orchestrator follows and policy-checks each hop)
/// - Request and connect timeouts from the configuration
/// - The SSRF-safe DNS resolver
/// - Rustls TLS backend (no native TLS)
///
/// No default User-Agent is set; each attempt sends its own.
///
/// # Errors
///
/// Returns a `reqwest::Error` if client creation fails.
pub fn init_client(config: &FetchConfig) -> Result<reqwest::Client, reqwest::Error> {
    ClientBuilder::new()
        .use_rustls_tls()
        .redirect(reqwest::redirect::Policy::none())
        .timeout(config.request_timeout)
        .connect_timeout(config.connect_timeout.min(config.request_timeout))
        .dns_resolver(Arc::new(SafeResolver))
        .build()
}
