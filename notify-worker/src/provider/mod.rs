//! Outbound SMS providers.
//!
//! The delivery queue talks to providers only through [`SmsProvider`]. Errors
//! are plain `ProviderError` values whose display string feeds the retry
//! classifier.

pub mod dry_run;
pub mod twilio;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::retry::with_api_retry;

pub use dry_run::DryRunProvider;
pub use twilio::TwilioProvider;

/// Provider acknowledgement for a dispatched message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryReceipt {
    /// Provider-side message identifier
    pub message_id: String,
    /// Provider delivery status, e.g. "queued" or "sent"
    pub status: String,
}

/// Errors returned by a provider send.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// The request never produced a response (connect, DNS, timeout).
    #[error("transport error: {0}")]
    Transport(String),

    /// The provider answered with a non-success status.
    #[error("HTTP {status}: {message}")]
    Status {
        status: u16,
        code: Option<i64>,
        message: String,
    },

    /// The provider answered 2xx but the body was unusable.
    #[error("invalid provider response: {0}")]
    InvalidResponse(String),

    /// Required credentials are missing.
    #[error("provider not configured: {0}")]
    NotConfigured(&'static str),

    /// The provider implementation panicked mid-send.
    #[error("provider panicked: {0}")]
    Panicked(String),
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        // reqwest's own message hides the cause ("error sending request for
        // url ..."); the source chain carries "timed out", "dns error", etc.
        let mut message = err.to_string();
        let mut source = std::error::Error::source(&err);
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }
        if err.is_timeout() && !message.to_lowercase().contains("timed out") {
            message.push_str(": request timed out");
        }
        ProviderError::Transport(message)
    }
}

/// Provider-send interface consumed by the delivery queue.
#[async_trait]
pub trait SmsProvider: Send + Sync {
    /// Short provider name for logs.
    fn name(&self) -> &'static str;

    /// Send `payload` to `destination`.
    async fn send(&self, destination: &str, payload: &str)
        -> Result<DeliveryReceipt, ProviderError>;
}

/// Send immediately, bypassing the delivery queue, with the `api_call` retry preset.
///
/// Use for one-off sends where the caller waits for the outcome. The queue's
/// rate limiter is not consulted.
pub async fn send_with_retry(
    provider: &dyn SmsProvider,
    destination: &str,
    payload: &str,
) -> Result<DeliveryReceipt, ProviderError> {
    let context = format!("{}_direct_send", provider.name());
    let receipt = with_api_retry(&context, || provider.send(destination, payload)).await?;

    info!(
        provider = provider.name(),
        destination = %destination,
        provider_message_id = %receipt.message_id,
        provider_status = %receipt.status,
        "sms_direct_send_complete"
    );

    Ok(receipt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retry::is_retryable;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct FlakyProvider {
        calls: AtomicU32,
        failures: u32,
        error: fn() -> ProviderError,
    }

    #[async_trait]
    impl SmsProvider for FlakyProvider {
        fn name(&self) -> &'static str {
            "flaky"
        }

        async fn send(
            &self,
            _destination: &str,
            _payload: &str,
        ) -> Result<DeliveryReceipt, ProviderError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if n <= self.failures {
                return Err((self.error)());
            }
            Ok(DeliveryReceipt {
                message_id: format!("SM{n}"),
                status: "queued".to_string(),
            })
        }
    }

    #[test]
    fn test_status_error_display_is_classifiable() {
        let throttled = ProviderError::Status {
            status: 429,
            code: Some(20429),
            message: "Too Many Requests".to_string(),
        };
        assert_eq!(throttled.to_string(), "HTTP 429: Too Many Requests");
        assert!(is_retryable(&throttled));

        let auth = ProviderError::Status {
            status: 401,
            code: Some(20003),
            message: "Authenticate".to_string(),
        };
        assert!(!is_retryable(&auth));
        assert!(!is_retryable(&ProviderError::NotConfigured("TWILIO_ACCOUNT_SID")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_with_retry_recovers_from_transient_errors() {
        let provider = FlakyProvider {
            calls: AtomicU32::new(0),
            failures: 2,
            error: || ProviderError::Transport("connection reset by peer".to_string()),
        };

        let receipt = send_with_retry(&provider, "+15550001111", "hi").await.unwrap();

        assert_eq!(receipt.message_id, "SM3");
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_with_retry_stops_on_permanent_error() {
        let provider = FlakyProvider {
            calls: AtomicU32::new(0),
            failures: 5,
            error: || ProviderError::Status {
                status: 400,
                code: Some(21211),
                message: "Invalid 'To' Phone Number".to_string(),
            },
        };

        let err = send_with_retry(&provider, "bogus", "hi").await.unwrap_err();

        assert!(matches!(err, ProviderError::Status { status: 400, .. }));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }
}
