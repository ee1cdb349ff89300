//! Minimum inter-request spacing per domain.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use log::debug;
use tokio::time::Instant;

use crate::config::PacingTable;

/// In-memory pacing shared by both limiter backends.
///
/// Last-attempt instants are process-local; they are never persisted.
#[derive(Debug)]
pub struct Pacer {
    table: PacingTable,
    slots: Mutex<HashMap<String, DomainSlots>>,
}

#[derive(Debug, Default, Clone, Copy)]
struct DomainSlots {
    /// When the last response from the domain arrived.
    last_attempt: Option<Instant>,
    /// Latest send instant handed out by `wait`.
    reserved: Option<Instant>,
}

impl Pacer {
    pub fn new(table: PacingTable) -> Self {
        Self {
            table,
            slots: Mutex::new(HashMap::new()),
        }
    }

    pub fn table(&self) -> &PacingTable {
        &self.table
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, DomainSlots>> {
        self.slots
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Sleeps until this caller's send slot for `domain`.
    ///
    /// Each call reserves the next free slot: at least one interval after both
    /// the last recorded attempt and the previous reservation, so concurrent
    /// callers are released one interval apart. The lock is released before
    /// sleeping.
    pub async fn wait(&self, domain: &str) {
        let now = Instant::now();
        let slot = {
            let interval = self.table.interval_for(domain);
            let mut slots = self.lock();
            let entry = slots.entry(domain.to_string()).or_default();
            let slot = [entry.last_attempt, entry.reserved]
                .into_iter()
                .flatten()
                .map(|at| at + interval)
                .fold(now, Instant::max);
            entry.reserved = Some(slot);
            slot
        };

        if slot > now {
            debug!("Pacing {}: waiting {:?}", domain, slot - now);
            tokio::time::sleep_until(slot).await;
        }
    }

    pub fn record_attempt(&self, domain: &str) {
        self.lock()
            .entry(domain.to_string())
            .or_default()
            .last_attempt = Some(Instant::now());
    }
}
