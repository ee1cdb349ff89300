//! Backoff arithmetic and `Retry-After` parsing.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use rand::Rng;

use crate::config::{RETRY_JITTER_MS, RETRY_MIN_DELAY_MS};

/// Looks up the block backoff for a domain with `consecutive_blocks` recorded
/// blocks. Counts beyond the table use its last entry; an empty table yields
/// zero.
pub fn block_backoff(table: &[Duration], consecutive_blocks: u32) -> Duration {
    let index = usize::try_from(consecutive_blocks).unwrap_or(usize::MAX);
    table
        .get(index)
        .or_else(|| table.last())
        .copied()
        .unwrap_or(Duration::ZERO)
}

/// Sleep before retrying a transient failure: `2^attempt` seconds plus up to
/// ±100 ms of jitter, never less than 100 ms.
pub fn transient_backoff(attempt: u32) -> Duration {
    let jitter = rand::rng().random_range(-RETRY_JITTER_MS..=RETRY_JITTER_MS);
    transient_backoff_with_jitter(attempt, jitter)
}

pub(crate) fn transient_backoff_with_jitter(attempt: u32, jitter_ms: i64) -> Duration {
    let base_ms = 1000i64.saturating_mul(1i64 << attempt.min(20));
    let total_ms = base_ms.saturating_add(jitter_ms);
    let floor = RETRY_MIN_DELAY_MS as i64;
    Duration::from_millis(total_ms.max(floor) as u64)
}

/// Parses a `Retry-After` header value: delay-seconds or an HTTP date.
///
/// Returns `None` when the value is neither, so the caller can apply its
/// default window.
pub fn parse_retry_after(value: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if value.bytes().all(|b| b.is_ascii_digit()) {
        let secs: i64 = value.parse().ok()?;
        return now.checked_add_signed(TimeDelta::try_seconds(secs)?);
    }

    DateTime::parse_from_rfc2822(value)
        .ok()
        .map(|date| date.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn table() -> Vec<Duration> {
        [300, 900, 3600, 21600]
            .into_iter()
            .map(Duration::from_secs)
            .collect()
    }

    #[test]
    fn test_block_backoff_indexes_table() {
        let t = table();
        assert_eq!(block_backoff(&t, 0), Duration::from_secs(300));
        assert_eq!(block_backoff(&t, 1), Duration::from_secs(900));
        assert_eq!(block_backoff(&t, 2), Duration::from_secs(3600));
        assert_eq!(block_backoff(&t, 3), Duration::from_secs(21600));
    }

    #[test]
    fn test_block_backoff_clamps_at_last_entry() {
        let t = table();
        for count in [4, 5, 10, 1000, u32::MAX] {
            assert_eq!(block_backoff(&t, count), Duration::from_secs(21600));
        }
        assert_eq!(block_backoff(&[], 3), Duration::ZERO);
    }

    #[test]
    fn test_transient_backoff_bounds() {
        for attempt in 0..3 {
            for _ in 0..50 {
                let delay = transient_backoff(attempt);
                let base = 1000u64 << attempt;
                assert!(delay >= Duration::from_millis(base - 100), "{:?}", delay);
                assert!(delay <= Duration::from_millis(base + 100), "{:?}", delay);
            }
        }
    }

    #[test]
    fn test_transient_backoff_floor() {
        assert_eq!(
            transient_backoff_with_jitter(0, -5000),
            Duration::from_millis(100)
        );
        assert_eq!(
            transient_backoff_with_jitter(1, 50),
            Duration::from_millis(2050)
        );
    }

    #[test]
    fn test_parse_retry_after_seconds() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(
            parse_retry_after("120", now),
            Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 2, 0).unwrap())
        );
        assert_eq!(parse_retry_after(" 0 ", now), Some(now));
    }

    #[test]
    fn test_parse_retry_after_http_date() {
        let now = Utc.with_ymd_and_hms(2015, 10, 21, 0, 0, 0).unwrap();
        assert_eq!(
            parse_retry_after("Wed, 21 Oct 2015 07:28:00 GMT", now),
            Some(Utc.with_ymd_and_hms(2015, 10, 21, 7, 28, 0).unwrap())
        );
    }

    #[test]
    fn test_parse_retry_after_garbage() {
        let now = Utc::now();
        assert_eq!(parse_retry_after("", now), None);
        assert_eq!(parse_retry_after("soon", now), None);
        assert_eq!(parse_retry_after("-5", now), None);
        assert_eq!(parse_retry_after("1.5", now), None);
    }
}
