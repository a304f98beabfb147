//! Retry and backoff for external calls.
//!
//! This module provides:
//! - A pure exponential backoff policy (no jitter)
//! - A text-based classifier for transient failures
//! - An async wrapper that retries an operation under a `RetryConfig`
//!
//! The delivery queue does not use this wrapper; it keeps its own fixed
//! retry schedule (see `queue::RetrySchedule`).

pub mod classify;
pub mod policy;
pub mod run;

pub use classify::{is_retryable, is_retryable_status};
pub use policy::{AbortReason, BackoffPolicy, RetryConfig, RetryDecision, RetryPredicate};
pub use run::{with_ai_retry, with_api_retry, with_retry};
