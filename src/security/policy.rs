//! Domain allowlist with SSRF protection.

use std::collections::HashSet;
use std::io;
use std::net::IpAddr;
use std::sync::Arc;

use async_trait::async_trait;
use log::debug;
use url::{Host, Url};

use super::ip::is_restricted_ip;
use crate::error_handling::{FetchError, NetworkErrorKind};
use crate::sanitize::sanitize;

/// Decides whether a URL may be fetched.
///
/// The orchestrator calls `assert_allowed` before the first request, on every
/// redirect target, and on the final URL before the body is trusted.
#[async_trait]
pub trait DomainPolicy: Send + Sync {
    /// Returns the parsed URL if it may be fetched.
    async fn assert_allowed(&self, url: &str) -> Result<Url, FetchError>;
}

/// Hostname to address resolution used by the SSRF check.
#[async_trait]
pub trait HostResolver: Send + Sync {
    async fn resolve(&self, host: &str) -> io::Result<Vec<IpAddr>>;
}

/// System resolver (`getaddrinfo` through tokio).
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemResolver;

#[async_trait]
impl HostResolver for SystemResolver {
    async fn resolve(&self, host: &str) -> io::Result<Vec<IpAddr>> {
        let addrs = tokio::net::lookup_host((host, 0)).await?;
        Ok(addrs.map(|addr| addr.ip()).collect())
    }
}

/// Exact-match hostname allowlist.
///
/// Checks run in order and stop at the first failure: parse, scheme
/// (`http`/`https` only), host present, host on the allowlist, and finally
/// every resolved address outside the restricted ranges. A host that does not
/// resolve is let through; the transport reports the DNS failure.
///
/// # Examples
///
/// ```
/// use source_fetch::security::{AllowedDomainPolicy, DomainPolicy};
///
/// # tokio_test_block_on(async {
/// let policy = AllowedDomainPolicy::new(["finance.yahoo.com"]);
/// assert!(policy.allows("FINANCE.yahoo.com"));
/// assert!(policy.assert_allowed("ftp://finance.yahoo.com/").await.is_err());
/// # });
/// # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
/// #     tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(f)
/// # }
/// ```
#[derive(Clone)]
pub struct AllowedDomainPolicy {
    allowed: HashSet<String>,
    resolver: Arc<dyn HostResolver>,
}

impl AllowedDomainPolicy {
    /// Creates a policy that resolves hosts with the system resolver.
    pub fn new<I, S>(domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            allowed: domains
                .into_iter()
                .map(|d| d.as_ref().trim().to_ascii_lowercase())
                .filter(|d| !d.is_empty())
                .collect(),
            resolver: Arc::new(SystemResolver),
        }
    }

    /// Replaces the resolver used for the SSRF check.
    pub fn with_resolver(mut self, resolver: Arc<dyn HostResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    /// Whether `host` is on the allowlist (case-insensitive exact match).
    pub fn allows(&self, host: &str) -> bool {
        self.allowed.contains(&host.to_ascii_lowercase())
    }

    async fn resolves_to_restricted(&self, host: &Host<&str>) -> bool {
        match host {
            Host::Ipv4(ip) => is_restricted_ip(IpAddr::V4(*ip)),
            Host::Ipv6(ip) => is_restricted_ip(IpAddr::V6(*ip)),
            Host::Domain(name) => match self.resolver.resolve(name).await {
                Ok(addrs) => addrs.into_iter().any(is_restricted_ip),
                Err(e) => {
                    debug!("Could not resolve {} for SSRF check: {}", name, e);
                    false
                }
            },
        }
    }
}

impl std::fmt::Debug for AllowedDomainPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AllowedDomainPolicy")
            .field("allowed", &self.allowed)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl DomainPolicy for AllowedDomainPolicy {
    async fn assert_allowed(&self, url: &str) -> Result<Url, FetchError> {
        let parsed = match Url::parse(url) {
            Ok(parsed) => parsed,
            Err(url::ParseError::EmptyHost) => {
                return Err(FetchError::network(NetworkErrorKind::MissingHost, url))
            }
            Err(_) => return Err(FetchError::network(NetworkErrorKind::InvalidUrl, url)),
        };

        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(FetchError::network(NetworkErrorKind::SchemeNotAllowed, url));
        }

        let (host_str, host) = match (parsed.host_str(), parsed.host()) {
            (Some(s), Some(host)) if !s.is_empty() => (s, host),
            _ => return Err(FetchError::network(NetworkErrorKind::MissingHost, url)),
        };

        if !self.allows(host_str) {
            debug!("Rejected {}: host {} not in allowlist", sanitize(url), host_str);
            return Err(FetchError::network(NetworkErrorKind::DomainNotAllowed, url));
        }

        if self.resolves_to_restricted(&host).await {
            return Err(FetchError::network(NetworkErrorKind::Ssrf, url));
        }

        Ok(parsed)
    }
}
