//! Provider that logs messages instead of sending them.
//!
//! Used when Twilio credentials are not configured (local development).

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tracing::info;

use super::{DeliveryReceipt, ProviderError, SmsProvider};

#[derive(Debug, Default)]
pub struct DryRunProvider {
    sent: AtomicU64,
}

impl DryRunProvider {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SmsProvider for DryRunProvider {
    fn name(&self) -> &'static str {
        "dry_run"
    }

    async fn send(
        &self,
        destination: &str,
        payload: &str,
    ) -> Result<DeliveryReceipt, ProviderError> {
        let n = self.sent.fetch_add(1, Ordering::Relaxed) + 1;

        info!(
            destination = %destination,
            payload_length = payload.len(),
            sequence = n,
            "dry_run_sms_logged"
        );

        Ok(DeliveryReceipt {
            message_id: format!("dry-run-{n}"),
            status: "logged".to_string(),
        })
    }
}
