//! Cancellable pauses and rate-limit jitter.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

/// Sleep for `wait`, waking immediately on cancellation. Returns `true` when
/// the wait ended because the token fired.
pub(crate) async fn wait_or_cancel(cancel: &CancellationToken, wait: Duration) -> bool {
    tokio::select! {
        _ = cancel.cancelled() => true,
        _ = tokio::time::sleep(wait) => false,
    }
}

/// Base pause plus a uniform random share of `jitter`.
pub(crate) fn jittered(base: Duration, jitter: Duration) -> Duration {
    base + jitter.mul_f64(fastrand::f64())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jitter_stays_within_bounds() {
        let base = Duration::from_millis(100);
        let jitter = Duration::from_millis(50);
        for _ in 0..100 {
            let paced = jittered(base, jitter);
            assert!(paced >= base);
            assert!(paced <= base + jitter);
        }
    }

    #[test]
    fn zero_jitter_is_exactly_base() {
        let base = Duration::from_millis(100);
        assert_eq!(jittered(base, Duration::ZERO), base);
    }

    #[tokio::test]
    async fn cancelled_token_cuts_the_wait_short() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        assert!(wait_or_cancel(&cancel, Duration::from_secs(3600)).await);
    }

    #[tokio::test]
    async fn uncancelled_wait_runs_to_completion() {
        let cancel = CancellationToken::new();
        assert!(!wait_or_cancel(&cancel, Duration::from_millis(1)).await);
    }
}
