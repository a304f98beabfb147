//! Front Desk notify - outbound SMS delivery for the front desk assistant.
//!
//! This library provides:
//! - `queue`: single-worker, rate-limited delivery queue with requeue-at-tail retries
//! - `retry`: exponential backoff, transient-error classifier, async retry wrapper
//! - `provider`: SMS provider interface with Twilio and dry-run implementations
//! - `web`: HTTP routes for enqueueing and monitoring
//!
//! ## Architecture
//!
//! ```text
//! Producers → POST /notifications → DeliveryQueue → RateLimiter → SmsProvider
//!                                         ↑                            │
//!                                         └──── requeue on failure ────┘
//! ```

pub mod config;
pub mod provider;
pub mod queue;
pub mod retry;
pub mod web;

// Re-export commonly used types
pub use config::Config;
pub use provider::{DeliveryReceipt, ProviderError, SmsProvider};
pub use queue::{DeliveryQueue, ItemId, ItemStatus, QueueConfig, QueueItem, QueueStatus};
pub use retry::{is_retryable, with_retry, RetryConfig};
pub use web::AppState;
