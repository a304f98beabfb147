//! Delivery queue item and status types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::provider::DeliveryReceipt;

/// Identifier assigned to every enqueued item.
pub type ItemId = Uuid;

/// Lifecycle state of a queue item.
///
/// Only `Pending` items change state; `Sent` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Pending,
    Sent,
    Failed,
}

/// One outbound message tracked by the delivery queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueItem {
    /// Unique identifier returned by `enqueue`
    pub id: ItemId,
    /// Recipient handle (phone number)
    pub destination: String,
    /// Message body
    pub payload: String,
    /// Caller metadata, passed through unchanged
    #[serde(default)]
    pub metadata: Map<String, Value>,
    /// Failed send attempts so far
    pub attempts: u32,
    pub status: ItemStatus,
    pub created_at: DateTime<Utc>,
    /// Error text of the final failed attempt (only when `Failed`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    /// Provider acknowledgement (only when `Sent`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receipt: Option<DeliveryReceipt>,
}

impl QueueItem {
    /// Create a new pending item with a fresh identifier.
    pub fn new(destination: String, payload: String, metadata: Map<String, Value>) -> Self {
        Self {
            id: Uuid::new_v4(),
            destination,
            payload,
            metadata,
            attempts: 0,
            status: ItemStatus::Pending,
            created_at: Utc::now(),
            last_error: None,
            receipt: None,
        }
    }

    pub(crate) fn mark_sent(&mut self, receipt: DeliveryReceipt) {
        self.status = ItemStatus::Sent;
        self.receipt = Some(receipt);
    }

    pub(crate) fn mark_failed(&mut self, error: String) {
        self.status = ItemStatus::Failed;
        self.last_error = Some(error);
    }
}

/// Point-in-time snapshot of a delivery queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStatus {
    /// Items waiting in the ordered list
    pub queue_length: usize,
    /// Whether the worker loop is running
    pub is_processing: bool,
    /// Items not yet finalised, including one held out for a retry delay
    pub pending_count: usize,
    /// Items finalised as failed since the queue was created
    pub failed_count: u64,
    /// Items finalised as sent since the queue was created
    pub sent_count: u64,
}
