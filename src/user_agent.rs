//! User-Agent selection.
//!
//! Requests without a fixed User-Agent draw one per attempt from a pool of
//! current desktop browser strings.

use rand::seq::IndexedRandom;

use crate::config::DEFAULT_USER_AGENT;

/// Chrome major version used in the generated Chrome strings.
const CHROME_VERSION: &str = "131.0.0.0";

/// Supplies the User-Agent header for an attempt.
pub trait UserAgentProvider: Send + Sync {
    fn random_user_agent(&self) -> String;
}

/// Generates a Chrome User-Agent string for the given platform token.
pub fn generate_user_agent(platform: &str, chrome_version: &str) -> String {
    format!(
        "Mozilla/5.0 ({}) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/{} Safari/537.36",
        platform, chrome_version
    )
}

/// Picks uniformly from a pool of browser strings.
#[derive(Debug, Clone)]
pub struct RandomUserAgentProvider {
    pool: Vec<String>,
}

impl RandomUserAgentProvider {
    /// Uses `pool`, or the built-in pool if `pool` is empty.
    pub fn new(pool: Vec<String>) -> Self {
        if pool.is_empty() {
            Self::default()
        } else {
            Self { pool }
        }
    }

    pub fn pool(&self) -> &[String] {
        &self.pool
    }
}

impl Default for RandomUserAgentProvider {
    fn default() -> Self {
        Self {
            pool: vec![
                DEFAULT_USER_AGENT.to_string(),
                generate_user_agent("Macintosh; Intel Mac OS X 10_15_7", CHROME_VERSION),
                generate_user_agent("X11; Linux x86_64", CHROME_VERSION),
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:133.0) Gecko/20100101 Firefox/133.0"
                    .to_string(),
                "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/18.1 Safari/605.1.15"
                    .to_string(),
            ],
        }
    }
}

impl UserAgentProvider for RandomUserAgentProvider {
    fn random_user_agent(&self) -> String {
        self.pool
            .choose(&mut rand::rng())
            .cloned()
            .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string())
    }
}

/// Always returns the same string.
#[derive(Debug, Clone)]
pub struct StaticUserAgentProvider(pub String);

impl UserAgentProvider for StaticUserAgentProvider {
    fn random_user_agent(&self) -> String {
        self.0.clone()
    }
}
