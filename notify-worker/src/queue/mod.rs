//! In-process delivery queue for outbound SMS.
//!
//! This module provides:
//! - Queue item and status types
//! - A sliding-window rate limiter
//! - The fixed retry schedule used for failed sends
//! - The single-worker delivery queue itself
//!
//! Items live only in process memory; a restart drops anything pending.

pub mod delivery;
pub mod limiter;
pub mod schedule;
pub mod types;

pub use delivery::{DeliveryQueue, QueueConfig};
pub use limiter::RateLimiter;
pub use schedule::RetrySchedule;
pub use types::{ItemId, ItemStatus, QueueItem, QueueStatus};
