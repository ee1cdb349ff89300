//! File-backed rate limiter.
//!
//! State is one JSON document (`ratelimit.json`) in a storage directory:
//!
//! ```json
//! {"blockedUntil": {"finance.yahoo.com": "2024-01-01T00:05:00Z"},
//!  "consecutiveBlocks": {"finance.yahoo.com": 1}}
//! ```
//!
//! Reads take a shared lock. Writes go to a temp file in the same directory
//! under an exclusive lock, which then atomically replaces the state file.
//! Not safe for concurrent writer processes.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use super::{Pacer, RateLimiter};
use crate::config::{PacingTable, RATE_LIMIT_STATE_FILE};
use crate::error_handling::{BlockCause, RateLimitStoreError};

/// Persisted state of the file backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitState {
    #[serde(default)]
    pub blocked_until: BTreeMap<String, DateTime<Utc>>,
    #[serde(default)]
    pub consecutive_blocks: BTreeMap<String, u32>,
}

/// Single-process rate limiter persisted to a JSON file.
#[derive(Debug)]
pub struct FileRateLimiter {
    dir: PathBuf,
    path: PathBuf,
    state: Mutex<RateLimitState>,
    pacer: Pacer,
}

impl FileRateLimiter {
    /// Opens the limiter in `dir`, creating the directory if needed.
    ///
    /// An unparseable state file is logged and replaced on the next write.
    pub fn open(dir: impl Into<PathBuf>, pacing: PacingTable) -> Result<Self, RateLimitStoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| io_error(&dir, e))?;
        let path = dir.join(RATE_LIMIT_STATE_FILE);
        let state = load_state(&path)?;

        Ok(Self {
            dir,
            path,
            state: Mutex::new(state),
            pacer: Pacer::new(pacing),
        })
    }

    /// Path of the JSON state file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Copy of the in-memory state.
    pub fn snapshot(&self) -> RateLimitState {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, RateLimitState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Writes the state; a failed write keeps the in-memory state and is logged.
    fn save(&self, state: &RateLimitState) {
        if let Err(e) = write_state(&self.dir, &self.path, state) {
            warn!("Failed to save rate limit state: {}", e);
        }
    }
}

fn io_error(path: &Path, source: io::Error) -> RateLimitStoreError {
    RateLimitStoreError::Io {
        path: path.display().to_string(),
        source,
    }
}

fn load_state(path: &Path) -> Result<RateLimitState, RateLimitStoreError> {
    let mut file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(RateLimitState::default()),
        Err(e) => return Err(io_error(path, e)),
    };

    fs2::FileExt::lock_shared(&file).map_err(|e| io_error(path, e))?;
    let mut raw = String::new();
    let read = file.read_to_string(&mut raw);
    // Unlock failure is harmless; the lock is released when the file closes
    let _ = fs2::FileExt::unlock(&file);
    read.map_err(|e| io_error(path, e))?;

    if raw.trim().is_empty() {
        return Ok(RateLimitState::default());
    }
    match serde_json::from_str(&raw) {
        Ok(state) => Ok(state),
        Err(e) => {
            warn!(
                "Ignoring unreadable rate limit state {}: {}",
                path.display(),
                e
            );
            Ok(RateLimitState::default())
        }
    }
}

fn write_state(dir: &Path, path: &Path, state: &RateLimitState) -> io::Result<()> {
    let json = serde_json::to_vec_pretty(state)?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    fs2::FileExt::lock_exclusive(tmp.as_file())?;
    tmp.write_all(&json)?;
    tmp.as_file().sync_all()?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tmp.as_file()
            .set_permissions(fs::Permissions::from_mode(0o600))?;
    }

    let _ = fs2::FileExt::unlock(tmp.as_file());
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[async_trait]
impl RateLimiter for FileRateLimiter {
    async fn is_rate_limited(&self, domain: &str) -> Result<bool, RateLimitStoreError> {
        let mut state = self.lock();
        let Some(until) = state.blocked_until.get(domain).copied() else {
            return Ok(false);
        };
        if Utc::now() < until {
            return Ok(true);
        }

        debug!("Block window for {} expired at {}", domain, until);
        state.blocked_until.remove(domain);
        self.save(&state);
        Ok(false)
    }

    async fn retry_time(&self, domain: &str) -> Result<Option<DateTime<Utc>>, RateLimitStoreError> {
        let now = Utc::now();
        Ok(self
            .lock()
            .blocked_until
            .get(domain)
            .copied()
            .filter(|until| *until > now))
    }

    async fn wait(&self, domain: &str) {
        self.pacer.wait(domain).await;
    }

    async fn record_attempt(&self, domain: &str) {
        self.pacer.record_attempt(domain);
    }

    async fn record_success(&self, domain: &str) -> Result<(), RateLimitStoreError> {
        let mut state = self.lock();
        let had_count = state.consecutive_blocks.remove(domain).is_some();
        let had_block = state.blocked_until.remove(domain).is_some();
        if had_count || had_block {
            self.save(&state);
        }
        Ok(())
    }

    async fn record_block(
        &self,
        domain: &str,
        retry_until: DateTime<Utc>,
        _cause: &BlockCause,
    ) -> Result<(), RateLimitStoreError> {
        let mut state = self.lock();
        *state.consecutive_blocks.entry(domain.to_string()).or_insert(0) += 1;
        state.blocked_until.insert(domain.to_string(), retry_until);
        self.save(&state);
        Ok(())
    }

    async fn consecutive_block_count(&self, domain: &str) -> Result<u32, RateLimitStoreError> {
        Ok(self
            .lock()
            .consecutive_blocks
            .get(domain)
            .copied()
            .unwrap_or(0))
    }

    async fn block(
        &self,
        domain: &str,
        until: DateTime<Utc>,
        _cause: &BlockCause,
    ) -> Result<(), RateLimitStoreError> {
        let mut state = self.lock();
        state.blocked_until.insert(domain.to_string(), until);
        self.save(&state);
        Ok(())
    }
}
