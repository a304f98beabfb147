//! Exponential backoff policy and per-call-site retry configuration.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use super::classify::is_retryable;

/// Predicate deciding whether a failed attempt may be retried.
pub type RetryPredicate = Arc<dyn Fn(&dyn fmt::Display) -> bool + Send + Sync>;

/// Exponential backoff without jitter.
///
/// `delay_for(attempt) = min(initial_delay * multiplier^attempt, max_delay)`
/// with `attempt` 0-indexed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffPolicy {
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
}

/// Why the retry loop stopped without success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortReason {
    /// The error was classified as permanent.
    NonRetryable,
    /// No attempts remain.
    Exhausted,
}

/// Decision returned by the backoff policy after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry after the given delay.
    Retry(Duration),
    /// Stop and propagate the error.
    Abort(AbortReason),
}

impl BackoffPolicy {
    /// Delay to wait after the given 0-indexed failed attempt.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let max_ms = self.max_delay.as_millis() as f64;
        let exponent = attempt.min(i32::MAX as u32) as i32;
        let raw_ms = self.initial_delay.as_millis() as f64 * self.multiplier.powi(exponent);

        // powi overflows to infinity for large attempts; min() keeps it bounded.
        let ms = if raw_ms.is_finite() { raw_ms.min(max_ms) } else { max_ms };
        Duration::from_millis(ms.max(0.0) as u64)
    }

    /// Decide what to do after the 0-indexed `attempt` failed.
    ///
    /// `max_retries` counts additional attempts, so `max_retries + 1` attempts
    /// run in total before the policy reports exhaustion.
    pub fn decide(&self, attempt: u32, max_retries: u32, retryable: bool) -> RetryDecision {
        if !retryable {
            return RetryDecision::Abort(AbortReason::NonRetryable);
        }
        if attempt >= max_retries {
            return RetryDecision::Abort(AbortReason::Exhausted);
        }
        RetryDecision::Retry(self.delay_for(attempt))
    }
}

/// Retry settings for one call site.
#[derive(Clone)]
pub struct RetryConfig {
    /// Additional attempts after the first.
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub backoff_multiplier: f64,
    pub should_retry: RetryPredicate,
    /// Label attached to every log event of this call site.
    pub context: String,
}

impl RetryConfig {
    /// Configuration with the default classifier as the retry predicate.
    pub fn new(
        context: impl Into<String>,
        max_retries: u32,
        initial_delay: Duration,
        max_delay: Duration,
        backoff_multiplier: f64,
    ) -> Self {
        Self {
            max_retries,
            initial_delay,
            max_delay,
            backoff_multiplier,
            should_retry: Arc::new(is_retryable),
            context: context.into(),
        }
    }

    /// Language-model calls: 3 retries, 2s doubling up to 15s.
    pub fn ai_operation(context: impl Into<String>) -> Self {
        Self::new(
            context,
            3,
            Duration::from_millis(2000),
            Duration::from_millis(15000),
            2.0,
        )
    }

    /// Generic outbound API calls: 2 retries, 1s doubling up to 5s.
    pub fn api_call(context: impl Into<String>) -> Self {
        Self::new(
            context,
            2,
            Duration::from_millis(1000),
            Duration::from_millis(5000),
            2.0,
        )
    }

    /// Replace the retry predicate.
    pub fn with_predicate<P>(mut self, predicate: P) -> Self
    where
        P: Fn(&dyn fmt::Display) -> bool + Send + Sync + 'static,
    {
        self.should_retry = Arc::new(predicate);
        self
    }

    pub fn backoff(&self) -> BackoffPolicy {
        BackoffPolicy {
            initial_delay: self.initial_delay,
            max_delay: self.max_delay,
            multiplier: self.backoff_multiplier,
        }
    }
}

impl fmt::Debug for RetryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryConfig")
            .field("context", &self.context)
            .field("max_retries", &self.max_retries)
            .field("initial_delay", &self.initial_delay)
            .field("max_delay", &self.max_delay)
            .field("backoff_multiplier", &self.backoff_multiplier)
            .finish_non_exhaustive()
    }
}
