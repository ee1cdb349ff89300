//! Run-scoped response cache for one API provider.
//!
//! Collection runs request the same provider endpoints many times (one
//! statement per company, shared macro series). Responses from the configured
//! provider domain are kept in memory for the life of the process; every other
//! host is ignored. There is no eviction.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use url::{form_urlencoded, Url};

use crate::fetch::FetchResult;
use crate::sanitize::is_sensitive_key;

/// In-memory cache keyed by normalized URL.
#[derive(Debug)]
pub struct ResponseCache {
    provider_domain: String,
    entries: Mutex<HashMap<String, Arc<FetchResult>>>,
}

impl ResponseCache {
    pub fn new(provider_domain: impl Into<String>) -> Self {
        Self {
            provider_domain: provider_domain.into().to_ascii_lowercase(),
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn provider_domain(&self) -> &str {
        &self.provider_domain
    }

    /// Normalized key for `url`: `scheme://host[:port]/path?sorted-query`
    /// without credentials. `None` for other hosts and unparseable URLs.
    pub fn cache_key(&self, url: &str) -> Option<String> {
        let parsed = Url::parse(url).ok()?;
        let host = parsed.host_str()?;
        if !host.eq_ignore_ascii_case(&self.provider_domain) {
            return None;
        }

        let mut key = format!("{}://{}", parsed.scheme(), host);
        if let Some(port) = parsed.port() {
            key.push_str(&format!(":{}", port));
        }
        key.push_str(parsed.path());

        let mut pairs: Vec<(String, String)> = parsed
            .query_pairs()
            .filter(|(name, _)| !is_sensitive_key(name))
            .map(|(name, value)| (name.into_owned(), value.into_owned()))
            .collect();
        if !pairs.is_empty() {
            pairs.sort();
            let query = form_urlencoded::Serializer::new(String::new())
                .extend_pairs(pairs)
                .finish();
            key.push('?');
            key.push_str(&query);
        }
        Some(key)
    }

    pub fn get(&self, url: &str) -> Option<Arc<FetchResult>> {
        let key = self.cache_key(url)?;
        self.lock().get(&key).cloned()
    }

    /// Stores `result`; a no-op for other hosts.
    pub fn set(&self, url: &str, result: Arc<FetchResult>) {
        if let Some(key) = self.cache_key(url) {
            self.lock().insert(key, result);
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Arc<FetchResult>>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
