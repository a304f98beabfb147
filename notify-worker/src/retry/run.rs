//! Retry loop: run an async operation until success or the policy says stop.

use std::fmt;
use std::future::Future;

use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use super::policy::{AbortReason, RetryConfig, RetryDecision};

/// Run `operation` under `config`, retrying transient failures.
///
/// At most `config.max_retries + 1` attempts are made. An error rejected by
/// `config.should_retry` is returned immediately; otherwise the last error is
/// returned once attempts run out.
pub async fn with_retry<T, E, F, Fut>(config: &RetryConfig, mut operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: fmt::Display,
{
    let policy = config.backoff();
    let max_attempts = config.max_retries.saturating_add(1);
    let mut attempt = 0u32;

    loop {
        debug!(
            context = %config.context,
            attempt = attempt + 1,
            max_attempts = max_attempts,
            "retry_attempt_start"
        );

        let err = match operation().await {
            Ok(value) => {
                if attempt > 0 {
                    info!(
                        context = %config.context,
                        attempts = attempt + 1,
                        "retry_succeeded_after_retry"
                    );
                }
                return Ok(value);
            }
            Err(err) => err,
        };

        let retryable = (config.should_retry)(&err);

        match policy.decide(attempt, config.max_retries, retryable) {
            RetryDecision::Retry(delay) => {
                warn!(
                    context = %config.context,
                    attempt = attempt + 1,
                    max_attempts = max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "retry_scheduled"
                );
                sleep(delay).await;
                attempt += 1;
            }
            RetryDecision::Abort(AbortReason::NonRetryable) => {
                warn!(
                    context = %config.context,
                    attempt = attempt + 1,
                    error = %err,
                    "retry_aborted_non_retryable"
                );
                return Err(err);
            }
            RetryDecision::Abort(AbortReason::Exhausted) => {
                error!(
                    context = %config.context,
                    attempts = attempt + 1,
                    error = %err,
                    "retry_exhausted"
                );
                return Err(err);
            }
        }
    }
}

/// Retry a language-model call with the `ai_operation` preset.
pub async fn with_ai_retry<T, E, F, Fut>(context: &str, operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: fmt::Display,
{
    with_retry(&RetryConfig::ai_operation(context), operation).await
}

/// Retry a generic outbound API call with the `api_call` preset.
pub async fn with_api_retry<T, E, F, Fut>(context: &str, operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: fmt::Display,
{
    with_retry(&RetryConfig::api_call(context), operation).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn test_first_success_returns_without_retry() {
        let calls = AtomicU32::new(0);
        let config = RetryConfig::api_call("test");

        let result: Result<&str, String> = with_retry(&config, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok("done") }
        })
        .await;

        assert_eq!(result, Ok("done"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_retryable_error_makes_one_attempt() {
        let calls = AtomicU32::new(0);
        let config = RetryConfig::api_call("test");
        let start = Instant::now();

        let result: Result<(), String> = with_retry(&config, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err("invalid api key".to_string()) }
        })
        .await;

        assert_eq!(result, Err("invalid api key".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_errors_then_success() {
        let calls = AtomicU32::new(0);
        let config = RetryConfig::api_call("test");
        let start = Instant::now();

        let result: Result<u32, String> = with_retry(&config, || {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if n < 3 {
                    Err("connect ETIMEDOUT".to_string())
                } else {
                    Ok(n)
                }
            }
        })
        .await;

        assert_eq!(result, Ok(3));
        let elapsed = start.elapsed();
        // initial_delay + initial_delay * multiplier
        assert!(elapsed >= Duration::from_millis(3000), "elapsed {elapsed:?}");
        assert!(elapsed < Duration::from_millis(3100), "elapsed {elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_propagates_last_error() {
        let calls = AtomicU32::new(0);
        let config = RetryConfig::api_call("test");

        let result: Result<(), String> = with_retry(&config, || {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move { Err(format!("HTTP 503 attempt {n}")) }
        })
        .await;

        assert_eq!(result, Err("HTTP 503 attempt 3".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ai_preset_allows_four_attempts() {
        let calls = AtomicU32::new(0);

        let result: Result<(), String> = with_ai_retry("llm_completion", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err("Too Many Requests".to_string()) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_custom_predicate_overrides_classifier() {
        let calls = AtomicU32::new(0);
        let config = RetryConfig::api_call("test").with_predicate(|_| false);

        let result: Result<(), String> = with_retry(&config, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err("HTTP 503".to_string()) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
