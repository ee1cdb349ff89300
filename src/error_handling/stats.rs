//! Fetch outcome statistics.
//!
//! Thread-safe counters for `fetch()` outcomes, shared by every worker that
//! uses the same orchestrator.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use strum::IntoEnumIterator;
use strum_macros::EnumIter as EnumIterMacro;

/// How a `fetch()` call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIterMacro)]
pub enum FetchOutcome {
    Success,
    CacheHit,
    NetworkError,
    RateLimited,
    Blocked,
    BlockedPermanently,
    StorageError,
}

impl FetchOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            FetchOutcome::Success => "success",
            FetchOutcome::CacheHit => "cache hit",
            FetchOutcome::NetworkError => "network error",
            FetchOutcome::RateLimited => "rate limited",
            FetchOutcome::Blocked => "blocked (cool-down)",
            FetchOutcome::BlockedPermanently => "blocked (not recoverable)",
            FetchOutcome::StorageError => "rate limit store error",
        }
    }
}

impl std::fmt::Display for FetchOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Thread-safe fetch statistics tracker.
///
/// Every outcome is initialized to zero on creation, so counters can be read
/// without checking for presence.
pub struct FetchStats {
    outcomes: HashMap<FetchOutcome, AtomicUsize>,
    attempts: AtomicUsize,
}

impl FetchStats {
    pub fn new() -> Self {
        let mut outcomes = HashMap::new();
        for outcome in FetchOutcome::iter() {
            outcomes.insert(outcome, AtomicUsize::new(0));
        }
        FetchStats {
            outcomes,
            attempts: AtomicUsize::new(0),
        }
    }

    /// Increment an outcome counter.
    pub fn increment(&self, outcome: FetchOutcome) {
        if let Some(counter) = self.outcomes.get(&outcome) {
            counter.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Count one HTTP attempt (each redirect chain counts once).
    pub fn increment_attempts(&self) {
        self.attempts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get(&self, outcome: FetchOutcome) -> usize {
        self.outcomes
            .get(&outcome)
            .map(|c| c.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::Relaxed)
    }

    /// Total number of finished `fetch()` calls.
    pub fn total(&self) -> usize {
        FetchOutcome::iter().map(|o| self.get(o)).sum()
    }

    /// Logs non-zero counters at info level.
    pub fn log_summary(&self) {
        log::info!(
            "Fetch summary: {} call(s), {} HTTP attempt(s)",
            self.total(),
            self.attempts()
        );
        for outcome in FetchOutcome::iter() {
            let count = self.get(outcome);
            if count > 0 {
                log::info!("   {}: {}", outcome, count);
            }
        }
    }
}

impl Default for FetchStats {
    fn default() -> Self {
        Self::new()
    }
}
