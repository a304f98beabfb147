//! Twilio Programmable Messaging client.
//!
//! Sends a single SMS via the Messages resource:
//! `POST {api_base}/2010-04-01/Accounts/{AccountSid}/Messages.json`
//! with HTTP basic auth (account SID, auth token) and a form body.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{info, warn};

use super::{DeliveryReceipt, ProviderError, SmsProvider};
use crate::retry::is_retryable_status;

/// Successful Messages resource response (only the fields we use).
#[derive(Debug, Deserialize)]
struct MessageResource {
    sid: String,
    #[serde(default)]
    status: Option<String>,
}

/// Twilio error body, e.g. `{"code": 21211, "message": "...", "status": 400}`.
#[derive(Debug, Deserialize)]
struct TwilioErrorBody {
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    message: Option<String>,
}

/// SMS provider backed by the Twilio REST API.
#[derive(Clone)]
pub struct TwilioProvider {
    client: Client,
    api_base: String,
    account_sid: String,
    auth_token: String,
    from_number: String,
}

impl TwilioProvider {
    /// Build a provider with its own HTTP client.
    pub fn new(
        api_base: String,
        account_sid: String,
        auth_token: String,
        from_number: String,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        if account_sid.is_empty() {
            return Err(ProviderError::NotConfigured("TWILIO_ACCOUNT_SID"));
        }
        if auth_token.is_empty() {
            return Err(ProviderError::NotConfigured("TWILIO_AUTH_TOKEN"));
        }
        if from_number.is_empty() {
            return Err(ProviderError::NotConfigured("TWILIO_FROM_NUMBER"));
        }

        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            account_sid,
            auth_token,
            from_number,
        })
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.api_base, self.account_sid
        )
    }
}

#[async_trait]
impl SmsProvider for TwilioProvider {
    fn name(&self) -> &'static str {
        "twilio"
    }

    async fn send(
        &self,
        destination: &str,
        payload: &str,
    ) -> Result<DeliveryReceipt, ProviderError> {
        let response = self
            .client
            .post(self.messages_url())
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&[
                ("To", destination),
                ("From", self.from_number.as_str()),
                ("Body", payload),
            ])
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.text().await?;

        if !(200..300).contains(&status) {
            let error = parse_error_body(status, &body);
            warn!(
                destination = %destination,
                status_code = status,
                retryable = is_retryable_status(status),
                error = %error,
                "twilio_send_rejected"
            );
            return Err(error);
        }

        let receipt = parse_message_body(&body)?;

        info!(
            destination = %destination,
            provider_message_id = %receipt.message_id,
            provider_status = %receipt.status,
            "twilio_send_accepted"
        );

        Ok(receipt)
    }
}

fn parse_message_body(body: &str) -> Result<DeliveryReceipt, ProviderError> {
    let resource: MessageResource = serde_json::from_str(body).map_err(|e| {
        let preview: String = body.chars().take(200).collect();
        ProviderError::InvalidResponse(format!("{}: {}", e, preview))
    })?;

    Ok(DeliveryReceipt {
        message_id: resource.sid,
        status: resource.status.unwrap_or_else(|| "unknown".to_string()),
    })
}

fn parse_error_body(status: u16, body: &str) -> ProviderError {
    let parsed: Option<TwilioErrorBody> = serde_json::from_str(body).ok();
    let (code, message) = match parsed {
        Some(err) => (err.code, err.message),
        None => (None, None),
    };

    let message = message.unwrap_or_else(|| {
        let trimmed = body.trim();
        if trimmed.is_empty() {
            "empty response body".to_string()
        } else {
            trimmed.chars().take(200).collect()
        }
    });

    ProviderError::Status {
        status,
        code,
        message,
    }
}
