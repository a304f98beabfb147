//! Sliding-window rate limiter for outbound sends.

use std::collections::VecDeque;
use std::time::Duration;

use tokio::time::Instant;

/// Admission control over a rolling window.
///
/// Timestamps older than `now - window` are dropped on every check, so the
/// cap applies to any window-length interval rather than to fixed buckets.
/// The limiter only advises; callers decide whether to wait.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    max_per_window: usize,
    window: Duration,
    sends: VecDeque<Instant>,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(1, Duration::from_secs(1))
    }
}

impl RateLimiter {
    pub fn new(max_per_window: usize, window: Duration) -> Self {
        Self {
            max_per_window,
            window,
            sends: VecDeque::new(),
        }
    }

    /// Prune expired timestamps and report whether another send fits.
    pub fn can_send_now(&mut self) -> bool {
        self.prune(Instant::now());
        self.sends.len() < self.max_per_window
    }

    /// Record a dispatched send at the current instant.
    pub fn record_send(&mut self) {
        self.sends.push_back(Instant::now());
    }

    fn prune(&mut self, now: Instant) {
        // Timestamps are pushed in order, so expired ones sit at the front.
        while let Some(&oldest) = self.sends.front() {
            if now.duration_since(oldest) >= self.window {
                self.sends.pop_front();
            } else {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::advance;

    #[tokio::test(start_paused = true)]
    async fn test_allows_up_to_cap() {
        let mut limiter = RateLimiter::new(2, Duration::from_secs(1));

        assert!(limiter.can_send_now());
        limiter.record_send();
        assert!(limiter.can_send_now());
        limiter.record_send();
        assert!(!limiter.can_send_now());
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_slides() {
        let mut limiter = RateLimiter::new(2, Duration::from_millis(1000));

        limiter.record_send();
        advance(Duration::from_millis(600)).await;
        limiter.record_send();
        assert!(!limiter.can_send_now());

        // First send expires at t=1000, second still counts until t=1600.
        advance(Duration::from_millis(400)).await;
        assert!(limiter.can_send_now());
        limiter.record_send();
        assert!(!limiter.can_send_now());

        advance(Duration::from_millis(600)).await;
        assert!(limiter.can_send_now());
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_boundary_burst() {
        let mut limiter = RateLimiter::default();

        advance(Duration::from_millis(990)).await;
        limiter.record_send();
        // A fixed one-second bucket would reset here; the sliding window does not.
        advance(Duration::from_millis(20)).await;
        assert!(!limiter.can_send_now());
    }

    #[tokio::test(start_paused = true)]
    async fn test_check_has_no_side_effect_beyond_pruning() {
        let mut limiter = RateLimiter::new(1, Duration::from_secs(1));

        for _ in 0..5 {
            assert!(limiter.can_send_now());
        }
        limiter.record_send();
        assert!(!limiter.can_send_now());
    }
}
