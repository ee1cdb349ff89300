//! Soft-block signatures.
//!
//! All patterns are lower-case; the detector lower-cases the body before
//! matching.

pub(super) const CAPTCHA_PATTERNS: &[&str] = &[
    "g-recaptcha",
    "grecaptcha",
    "hcaptcha",
    "cf-turnstile",
    "captcha-container",
    "please verify you are a human",
    "prove you're not a robot",
    "complete the security check",
];

pub(super) const JS_CHALLENGE_PATTERNS: &[&str] = &[
    "cf-browser-verification",
    "cf_chl_prog",
    "challenge-platform",
    "just a moment...",
    "checking your browser",
    "please wait while we verify",
    "__cf_chl_rt_tk",
    "jschl-answer",
];

pub(super) const RATE_LIMIT_PATTERNS: &[&str] = &[
    "too many requests",
    "rate limit exceeded",
    "you have been rate limited",
    "slow down",
    "try again later",
];

pub(super) const GEO_BLOCK_PATTERNS: &[&str] = &[
    "not available in your region",
    "not available in your country",
    "geo-restricted",
    "access denied based on your location",
];

pub(super) const LOGIN_REQUIRED_PATTERNS: &[&str] = &[
    "sign in to continue",
    "login required",
    "please log in",
    "create an account",
];

pub(super) fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| haystack.contains(needle))
}
