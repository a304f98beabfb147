//! Fixed retry-delay schedule used by the delivery queue.
//!
//! This is deliberately separate from `retry::BackoffPolicy`: the queue uses a
//! short hand-tuned list of delays rather than a formula.

use std::time::Duration;

/// Attempt-indexed delays; the last entry repeats for later attempts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrySchedule {
    delays: Vec<Duration>,
}

impl Default for RetrySchedule {
    fn default() -> Self {
        Self::from_millis(&[2000, 5000, 10000])
    }
}

impl RetrySchedule {
    /// Build a schedule. An empty list means "retry without delay".
    pub fn new(delays: Vec<Duration>) -> Self {
        Self { delays }
    }

    pub fn from_millis(delays_ms: &[u64]) -> Self {
        Self::new(delays_ms.iter().copied().map(Duration::from_millis).collect())
    }

    /// Delay before re-appending an item after its `attempts`-th failure (1-based).
    pub fn delay_for(&self, attempts: u32) -> Duration {
        let index = (attempts.saturating_sub(1) as usize).min(self.delays.len().saturating_sub(1));
        self.delays.get(index).copied().unwrap_or(Duration::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_schedule_clamps_to_last() {
        let schedule = RetrySchedule::default();
        assert_eq!(schedule.delay_for(1), Duration::from_secs(2));
        assert_eq!(schedule.delay_for(2), Duration::from_secs(5));
        assert_eq!(schedule.delay_for(3), Duration::from_secs(10));
        assert_eq!(schedule.delay_for(4), Duration::from_secs(10));
        assert_eq!(schedule.delay_for(50), Duration::from_secs(10));
    }

    #[test]
    fn test_zero_attempts_uses_first_entry() {
        let schedule = RetrySchedule::from_millis(&[100, 200]);
        assert_eq!(schedule.delay_for(0), Duration::from_millis(100));
    }

    #[test]
    fn test_empty_schedule() {
        let schedule = RetrySchedule::new(Vec::new());
        assert_eq!(schedule.delay_for(1), Duration::ZERO);
    }
}
