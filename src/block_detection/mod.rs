//! Soft-block detection.
//!
//! Some origins answer HTTP 200 with a CAPTCHA, a JavaScript challenge, a
//! rate-limit notice, a geo-block, or a login wall instead of real content.
//! `BlockDetector` classifies such pages by pattern matching on the body of
//! HTML responses. Non-HTML responses (JSON, binary) are never scanned.

mod patterns;

use strum_macros::{AsRefStr, EnumIter};

use crate::config::HTTP_STATUS_SERVICE_UNAVAILABLE;
use crate::fetch::FetchResult;
use patterns::{
    contains_any, CAPTCHA_PATTERNS, GEO_BLOCK_PATTERNS, JS_CHALLENGE_PATTERNS,
    LOGIN_REQUIRED_PATTERNS, RATE_LIMIT_PATTERNS,
};

/// Soft-block classification of a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum BlockReason {
    None,
    Captcha,
    JavaScriptChallenge,
    RateLimitPage,
    GeoBlocked,
    LoginRequired,
    ServiceUnavailable,
}

impl BlockReason {
    /// Whether a later retry may succeed.
    ///
    /// This is not "safe to treat as success": `Captcha` and `RateLimitPage`
    /// are recoverable but still put the domain into backoff.
    pub fn is_recoverable(self) -> bool {
        match self {
            BlockReason::None
            | BlockReason::Captcha
            | BlockReason::RateLimitPage
            | BlockReason::ServiceUnavailable => true,
            BlockReason::JavaScriptChallenge
            | BlockReason::GeoBlocked
            | BlockReason::LoginRequired => false,
        }
    }

    /// Whether the orchestrator records a block with backoff for this reason.
    pub fn requires_backoff(self) -> bool {
        matches!(self, BlockReason::Captcha | BlockReason::RateLimitPage)
    }
}

/// Classifies responses that deny content without an error status.
pub trait SoftBlockDetector: Send + Sync {
    fn detect(&self, result: &FetchResult) -> BlockReason;

    fn is_recoverable(&self, reason: BlockReason) -> bool {
        reason.is_recoverable()
    }
}

/// Pattern-based detector.
///
/// Precedence: Captcha > JavaScriptChallenge > RateLimitPage > GeoBlocked >
/// LoginRequired; a 503 with none of these is `ServiceUnavailable`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlockDetector;

impl SoftBlockDetector for BlockDetector {
    fn detect(&self, result: &FetchResult) -> BlockReason {
        if !result.is_html() {
            return BlockReason::None;
        }

        let content = result.text().to_lowercase();

        let checks: [(&[&str], BlockReason); 5] = [
            (CAPTCHA_PATTERNS, BlockReason::Captcha),
            (JS_CHALLENGE_PATTERNS, BlockReason::JavaScriptChallenge),
            (RATE_LIMIT_PATTERNS, BlockReason::RateLimitPage),
            (GEO_BLOCK_PATTERNS, BlockReason::GeoBlocked),
            (LOGIN_REQUIRED_PATTERNS, BlockReason::LoginRequired),
        ];
        for (patterns, reason) in checks {
            if contains_any(&content, patterns) {
                return reason;
            }
        }

        if result.status_code == HTTP_STATUS_SERVICE_UNAVAILABLE {
            return BlockReason::ServiceUnavailable;
        }

        BlockReason::None
    }
}
