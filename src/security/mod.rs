//! Outbound request security.
//!
//! This module guards every request the fetch subsystem makes:
//! - Allowlist and SSRF checks on request, redirect, and final URLs (`DomainPolicy`)
//! - Classification of private, loopback, and link-local addresses
//! - A reqwest DNS resolver that drops restricted addresses before connecting

mod ip;
mod policy;
mod safe_resolver;

pub use ip::is_restricted_ip;
pub use policy::{AllowedDomainPolicy, DomainPolicy, HostResolver, SystemResolver};
pub use safe_resolver::SafeResolver;
