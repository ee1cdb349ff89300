//! Resilient outbound fetching.
//!
//! This module provides:
//! - `FetchOrchestrator`: the retry/backoff state machine behind `fetch()`
//! - `FetchRequest` / `FetchResult`: what to fetch and what came back
//! - The `HttpTransport` seam and its reqwest implementation
//! - Backoff arithmetic and `Retry-After` parsing

mod orchestrator;
mod redirects;
mod request;
mod result;
mod retry;
mod transport;

pub use orchestrator::{FetchOrchestrator, FetchOrchestratorBuilder};
pub use request::FetchRequest;
pub use result::FetchResult;
pub use retry::{block_backoff, parse_retry_after, transient_backoff};
pub use transport::{HttpTransport, RawResponse, ReqwestTransport, TransportRequest};
