//! source_fetch library: resilient outbound fetching for data collection
//!
//! This library fetches third-party pages and APIs on behalf of a collection
//! pipeline while defending against SSRF, detecting soft and hard blocks, and
//! respecting each upstream's tolerance for request volume.
//!
//! Every `fetch()` goes through the same state machine:
//! allowlist + SSRF check, per-domain block check, paced attempts with
//! exponential backoff on transient failures, redirect hops re-checked against
//! the allowlist, and content inspection for CAPTCHA / challenge pages.
//!
//! # Example
//!
//! ```no_run
//! use source_fetch::{init_orchestrator, FetchConfig, FetchError, FetchRequest};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = FetchConfig {
//!     allowed_domains: vec!["finance.yahoo.com".to_string()],
//!     ..Default::default()
//! };
//! let orchestrator = init_orchestrator(config, None, None).await?;
//!
//! match orchestrator
//!     .fetch(&FetchRequest::new("https://finance.yahoo.com/quote/AAPL"))
//!     .await
//! {
//!     Ok(result) => println!("{} bytes", result.content.len()),
//!     Err(FetchError::RateLimited { retry_at, .. }) => println!("come back at {:?}", retry_at),
//!     Err(e) => return Err(e.into()),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Requirements
//!
//! This library requires a Tokio runtime. Use `#[tokio::main]` in your application
//! or ensure you're calling library functions within an async context.

pub mod alerts;
pub mod block_detection;
pub mod cache;
pub mod config;
pub mod error_handling;
pub mod fetch;
pub mod initialization;
pub mod rate_limiter;
pub mod sanitize;
pub mod security;
pub mod storage;
pub mod user_agent;

// Re-export public API
pub use block_detection::{BlockDetector, BlockReason, SoftBlockDetector};
pub use cache::ResponseCache;
pub use config::{FetchConfig, LogFormat, LogLevel, PacingTable, StateBackend};
pub use error_handling::{BlockCause, FetchError, NetworkErrorKind, TransportError};
pub use fetch::{FetchOrchestrator, FetchRequest, FetchResult};
pub use initialization::{init_orchestrator, init_rate_limiter};
pub use rate_limiter::{DatabaseRateLimiter, FileRateLimiter, RateLimiter};
pub use sanitize::sanitize;
pub use security::{AllowedDomainPolicy, DomainPolicy};
