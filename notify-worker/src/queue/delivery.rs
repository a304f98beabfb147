//! Single-consumer, rate-limited delivery queue for outbound SMS.
//!
//! Producers call [`DeliveryQueue::enqueue`] and get an item id back at once.
//! A single worker task, started lazily on the first enqueue into an idle
//! queue, drains the list in order:
//!
//! ```text
//! enqueue → [items] → rate limiter → provider.send → sent
//!                ↑                         │
//!                └── retry delay ── failed ┴→ failed (retries exhausted)
//! ```
//!
//! A failed item is removed from the head, held out for its retry delay, and
//! re-appended at the tail. Items that never fail keep enqueue order; a
//! retried item falls behind everything enqueued before it comes back.

use std::any::Any;
use std::collections::VecDeque;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use serde_json::{Map, Value};
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use super::limiter::RateLimiter;
use super::schedule::RetrySchedule;
use super::types::{ItemId, QueueItem, QueueStatus};
use crate::provider::{DeliveryReceipt, ProviderError, SmsProvider};
use crate::retry::is_retryable;

/// Delivery queue settings.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Sends allowed per rolling window
    pub max_per_window: usize,
    /// Rate limiter window; also the poll interval while throttled
    pub window: Duration,
    /// Retries after the first failed attempt
    pub max_retries: u32,
    /// Delay before a failed item is re-appended
    pub retry_schedule: RetrySchedule,
    /// Pause after every processed item
    pub message_delay: Duration,
    /// Finalised items kept for lookup
    pub history_limit: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_per_window: 1,
            window: Duration::from_millis(1000),
            max_retries: 3,
            retry_schedule: RetrySchedule::default(),
            message_delay: Duration::from_millis(100),
            history_limit: 1000,
        }
    }
}

/// Shared handle to a delivery queue. Clones refer to the same queue.
#[derive(Clone)]
pub struct DeliveryQueue {
    inner: Arc<QueueInner>,
}

struct QueueInner {
    config: QueueConfig,
    provider: Arc<dyn SmsProvider>,
    state: Mutex<QueueState>,
}

struct QueueState {
    items: VecDeque<QueueItem>,
    /// Item removed from the list while it waits out its retry delay.
    retrying: Option<QueueItem>,
    /// Set while a worker task owns the loop.
    processing: bool,
    limiter: RateLimiter,
    history: VecDeque<QueueItem>,
    sent_total: u64,
    failed_total: u64,
}

/// What the worker does next, decided under the lock.
enum Step {
    Idle,
    Throttled,
    Send(QueueItem),
}

impl QueueState {
    fn pop_head(&mut self, id: ItemId) -> Option<QueueItem> {
        match self.items.front() {
            Some(head) if head.id == id => self.items.pop_front(),
            _ => None,
        }
    }

    fn archive(&mut self, item: QueueItem, limit: usize) {
        self.history.push_back(item);
        while self.history.len() > limit {
            self.history.pop_front();
        }
    }
}

impl DeliveryQueue {
    /// Create an idle queue sending through `provider`.
    pub fn new(config: QueueConfig, provider: Arc<dyn SmsProvider>) -> Self {
        let limiter = RateLimiter::new(config.max_per_window, config.window);

        Self {
            inner: Arc::new(QueueInner {
                config,
                provider,
                state: Mutex::new(QueueState {
                    items: VecDeque::new(),
                    retrying: None,
                    processing: false,
                    limiter,
                    history: VecDeque::new(),
                    sent_total: 0,
                    failed_total: 0,
                }),
            }),
        }
    }

    /// Append a message and start the worker if it is idle.
    ///
    /// Never fails and performs no validation; delivery errors only show up
    /// on the item's status.
    pub async fn enqueue(
        &self,
        destination: impl Into<String>,
        payload: impl Into<String>,
        metadata: Map<String, Value>,
    ) -> ItemId {
        let item = QueueItem::new(destination.into(), payload.into(), metadata);
        let id = item.id;

        let start_worker = {
            let mut state = self.inner.state.lock().await;
            state.items.push_back(item);

            info!(
                item_id = %id,
                queue_length = state.items.len(),
                "sms_enqueued"
            );

            let idle = !state.processing;
            state.processing = true;
            idle
        };

        if start_worker {
            info!(provider = self.inner.provider.name(), "sms_worker_started");
            let queue = self.clone();
            tokio::spawn(async move {
                if let Err(panic) = AssertUnwindSafe(queue.clone().run_worker())
                    .catch_unwind()
                    .await
                {
                    error!(panic = %panic_message(&*panic), "sms_worker_aborted");
                    queue.inner.state.lock().await.processing = false;
                }
            });
        }

        id
    }

    /// Snapshot of queue counters.
    pub async fn status(&self) -> QueueStatus {
        let state = self.inner.state.lock().await;

        QueueStatus {
            queue_length: state.items.len(),
            is_processing: state.processing,
            pending_count: state.items.len() + usize::from(state.retrying.is_some()),
            failed_count: state.failed_total,
            sent_count: state.sent_total,
        }
    }

    /// Look up an item that is waiting, retrying, or recently finalised.
    pub async fn get(&self, id: ItemId) -> Option<QueueItem> {
        let state = self.inner.state.lock().await;

        state
            .items
            .iter()
            .chain(state.retrying.iter())
            .chain(state.history.iter().rev())
            .find(|item| item.id == id)
            .cloned()
    }

    async fn run_worker(self) {
        loop {
            let step = {
                let mut state = self.inner.state.lock().await;
                // Clearing the flag under the same lock that enqueue uses
                // guarantees a concurrent enqueue either sees the worker
                // running or starts a new one.
                if state.items.is_empty() {
                    state.processing = false;
                    Step::Idle
                } else if !state.limiter.can_send_now() {
                    Step::Throttled
                } else {
                    state.items.front().cloned().map_or(Step::Idle, Step::Send)
                }
            };

            match step {
                Step::Idle => {
                    info!("sms_worker_idle");
                    return;
                }
                Step::Throttled => {
                    debug!(
                        wait_ms = self.inner.config.window.as_millis() as u64,
                        "sms_rate_limited"
                    );
                    sleep(self.inner.config.window).await;
                }
                Step::Send(item) => {
                    self.process(item).await;
                    sleep(self.inner.config.message_delay).await;
                }
            }
        }
    }

    async fn process(&self, head: QueueItem) {
        debug!(
            item_id = %head.id,
            attempt = head.attempts + 1,
            "sms_send_starting"
        );

        let send = self.inner.provider.send(&head.destination, &head.payload);
        let result = match AssertUnwindSafe(send).catch_unwind().await {
            Ok(result) => result,
            Err(panic) => Err(ProviderError::Panicked(panic_message(&*panic))),
        };

        match result {
            Ok(receipt) => self.finish_sent(head.id, receipt).await,
            Err(err) => self.handle_failure(head.id, err).await,
        }
    }

    async fn finish_sent(&self, id: ItemId, receipt: DeliveryReceipt) {
        let mut state = self.inner.state.lock().await;
        state.limiter.record_send();

        let Some(mut item) = state.pop_head(id) else {
            error!(item_id = %id, "sms_queue_head_mismatch");
            return;
        };

        info!(
            item_id = %id,
            destination = %item.destination,
            attempts = item.attempts,
            provider_message_id = %receipt.message_id,
            provider_status = %receipt.status,
            metadata = ?item.metadata,
            "sms_sent"
        );

        item.mark_sent(receipt);
        state.sent_total += 1;
        state.archive(item, self.inner.config.history_limit);
    }

    async fn handle_failure(&self, id: ItemId, err: ProviderError) {
        let max_retries = self.inner.config.max_retries;

        let delay = {
            let mut state = self.inner.state.lock().await;

            let Some(mut item) = state.pop_head(id) else {
                error!(item_id = %id, "sms_queue_head_mismatch");
                return;
            };
            item.attempts += 1;

            if item.attempts > max_retries {
                error!(
                    item_id = %id,
                    destination = %item.destination,
                    attempts = item.attempts,
                    error = %err,
                    metadata = ?item.metadata,
                    "sms_send_failed_permanently"
                );

                item.mark_failed(err.to_string());
                state.failed_total += 1;
                state.archive(item, self.inner.config.history_limit);
                return;
            }

            let delay = self.inner.config.retry_schedule.delay_for(item.attempts);

            warn!(
                item_id = %id,
                destination = %item.destination,
                attempts = item.attempts,
                max_retries = max_retries,
                retry_in_ms = delay.as_millis() as u64,
                retryable = is_retryable(&err),
                error = %err,
                "sms_send_failed_requeue"
            );

            state.retrying = Some(item);
            delay
        };

        sleep(delay).await;

        let mut state = self.inner.state.lock().await;
        if let Some(item) = state.retrying.take() {
            debug!(
                item_id = %item.id,
                queue_length = state.items.len() + 1,
                "sms_requeued_at_tail"
            );
            state.items.push_back(item);
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
