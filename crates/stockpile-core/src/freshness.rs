//! Staleness decision for cached records.

use std::time::Duration;

use chrono::{DateTime, Utc};

/// Whether a cached record is due for a scheduler-driven refresh.
///
/// Returns `true` when no prior refresh timestamp exists, or when at least
/// `threshold` has elapsed since it. Pure function; the read path never
/// consults this — once a value is cached, reads serve it regardless of age,
/// and only the scheduler acts on staleness.
pub fn is_stale(last_refresh: Option<DateTime<Utc>>, now: DateTime<Utc>, threshold: Duration) -> bool {
    let Some(last) = last_refresh else {
        return true;
    };
    let threshold =
        chrono::Duration::from_std(threshold).unwrap_or(chrono::TimeDelta::MAX);
    now.signed_duration_since(last) >= threshold
}

#[cfg(test)]
mod tests {
    use super::*;

    const DAY: Duration = Duration::from_secs(24 * 60 * 60);

    #[test]
    fn absent_timestamp_is_stale() {
        assert!(is_stale(None, Utc::now(), DAY));
    }

    #[test]
    fn old_timestamp_is_stale() {
        let now = Utc::now();
        let last = now - chrono::Duration::hours(30);
        assert!(is_stale(Some(last), now, DAY));
    }

    #[test]
    fn recent_timestamp_is_fresh() {
        let now = Utc::now();
        let last = now - chrono::Duration::hours(2);
        assert!(!is_stale(Some(last), now, DAY));
    }

    #[test]
    fn threshold_boundary_is_stale() {
        let now = Utc::now();
        let last = now - chrono::Duration::hours(24);
        assert!(is_stale(Some(last), now, DAY));
    }

    #[test]
    fn future_timestamp_is_fresh() {
        let now = Utc::now();
        let last = now + chrono::Duration::hours(1);
        assert!(!is_stale(Some(last), now, DAY));
    }
}
