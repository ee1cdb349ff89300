//! SSRF-safe DNS resolver for reqwest.
//!
//! Implements `reqwest::dns::Resolve` by delegating to the system resolver and
//! then dropping every restricted address. Connections to private, loopback,
//! or link-local addresses are refused *before* reqwest opens a TCP socket,
//! which closes the DNS-rebinding gap between the policy check and connect.

use std::net::SocketAddr;
use std::sync::Arc;

use once_cell::sync::Lazy;
use reqwest::dns::{Addrs, Name, Resolve, Resolving};
use tokio::sync::Semaphore;

use super::ip::is_restricted_ip;

/// Concurrency limiter for DNS lookups
static DNS_SEMAPHORE: Lazy<Arc<Semaphore>> = Lazy::new(|| Arc::new(Semaphore::new(64)));

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A DNS resolver that never hands reqwest a restricted address.
///
/// If *all* resolved addresses are restricted, resolution fails with
/// `PermissionDenied`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SafeResolver;

impl Resolve for SafeResolver {
    fn resolve(&self, name: Name) -> Resolving {
        Box::pin(async move {
            let _permit = DNS_SEMAPHORE
                .acquire()
                .await
                .map_err(|e| -> BoxError { Box::new(e) })?;

            let addrs: Vec<SocketAddr> = tokio::net::lookup_host((name.as_str(), 0))
                .await
                .map_err(|e| -> BoxError { Box::new(e) })?
                .filter(|addr| !is_restricted_ip(addr.ip()))
                .collect();

            if addrs.is_empty() {
                return Err(Box::new(std::io::Error::new(
                    std::io::ErrorKind::PermissionDenied,
                    format!(
                        "SSRF blocked: all resolved IPs for '{}' are private/reserved",
                        name.as_str()
                    ),
                )) as BoxError);
            }

            let addrs: Addrs = Box::new(addrs.into_iter());
            Ok(addrs)
        })
    }
}
