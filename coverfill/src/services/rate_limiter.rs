//! Per-host request pacing
//!
//! Each caller reserves the next free slot under the lock and sleeps until
//! that slot, outside the lock, so concurrent callers queue up one interval
//! apart.

use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Keeps requests at least `min_interval` apart
pub struct RateLimiter {
    next_slot: Mutex<Option<Instant>>,
    min_interval: Duration,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            next_slot: Mutex::new(None),
            min_interval,
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Resolve once this caller may send its request
    pub async fn wait(&self) {
        let slot = {
            let mut next = self.next_slot.lock().await;
            let now = Instant::now();
            let slot = match *next {
                Some(reserved) if reserved > now => reserved,
                _ => now,
            };
            *next = Some(slot + self.min_interval);
            slot
        };

        if slot > Instant::now() {
            tracing::debug!(
                wait_ms = (slot - Instant::now()).as_millis() as u64,
                "Pacing request"
            );
            tokio::time::sleep_until(slot).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_requests_spaced_by_interval() {
        let limiter = RateLimiter::new(Duration::from_secs(1));
        let start = Instant::now();

        limiter.wait().await;
        assert_eq!(start.elapsed(), Duration::ZERO);

        limiter.wait().await;
        limiter.wait().await;
        assert!(start.elapsed() >= Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_gap_is_not_banked() {
        let limiter = RateLimiter::new(Duration::from_secs(1));
        limiter.wait().await;

        tokio::time::advance(Duration::from_secs(5)).await;

        let start = Instant::now();
        limiter.wait().await;
        assert_eq!(start.elapsed(), Duration::ZERO);
        limiter.wait().await;
        assert!(start.elapsed() >= Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_callers_queue() {
        let limiter = Arc::new(RateLimiter::new(Duration::from_millis(500)));
        let start = Instant::now();

        let handles: Vec<_> = (0..3)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                tokio::spawn(async move {
                    limiter.wait().await;
                    start.elapsed()
                })
            })
            .collect();

        let mut finished = Vec::new();
        for handle in handles {
            finished.push(handle.await.unwrap());
        }
        finished.sort();

        assert_eq!(finished[0], Duration::ZERO);
        assert!(finished[2] >= Duration::from_millis(1000));
    }

    #[tokio::test]
    async fn test_zero_interval_never_sleeps() {
        let limiter = RateLimiter::new(Duration::ZERO);
        let start = Instant::now();
        for _ in 0..5 {
            limiter.wait().await;
        }
        assert!(start.elapsed() < Duration::from_millis(100));
        assert_eq!(limiter.min_interval(), Duration::ZERO);
    }
}
