//! HTTP endpoint handlers.
//!
//! Enqueue returns as soon as the item is appended; delivery happens on the
//! queue's worker. The direct-send route is the only one that waits on the
//! provider.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, error, info, warn};

use crate::provider::{send_with_retry, DeliveryReceipt, SmsProvider};
use crate::queue::{DeliveryQueue, ItemId, QueueStatus};
use crate::Config;

/// Header carrying the shared API token on write routes.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub queue: DeliveryQueue,
    pub provider: Arc<dyn SmsProvider>,
}

impl AppState {
    pub fn new(config: Config, queue: DeliveryQueue, provider: Arc<dyn SmsProvider>) -> Self {
        Self {
            config: Arc::new(config),
            queue,
            provider,
        }
    }
}

// =============================================================================
// Health Check
// =============================================================================

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

// =============================================================================
// Queue Inspection
// =============================================================================

/// Queue status endpoint.
pub async fn queue_status(State(state): State<AppState>) -> Json<QueueStatus> {
    Json(state.queue.status().await)
}

/// Single item lookup.
pub async fn queue_item(State(state): State<AppState>, Path(id): Path<ItemId>) -> Response {
    match state.queue.get(id).await {
        Some(item) => (StatusCode::OK, Json(item)).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                status: "not_found",
                error: format!("no queue item {id}"),
            }),
        )
            .into_response(),
    }
}

// =============================================================================
// Notifications
// =============================================================================

/// Outbound SMS request body.
#[derive(Debug, Deserialize)]
pub struct NotificationRequest {
    pub destination: String,
    pub payload: String,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

/// Enqueue response.
#[derive(Serialize)]
pub struct EnqueueResponse {
    pub status: &'static str,
    pub item_id: ItemId,
}

/// Direct send response.
#[derive(Serialize)]
pub struct DirectSendResponse {
    pub status: &'static str,
    pub receipt: DeliveryReceipt,
}

/// Error response body.
#[derive(Serialize)]
pub struct ErrorResponse {
    pub status: &'static str,
    pub error: String,
}

/// Enqueue an SMS for rate-limited delivery.
pub async fn enqueue_notification(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<NotificationRequest>,
) -> Response {
    if !is_authorized(&headers, state.config.api_token.as_deref()) {
        return unauthorized();
    }

    let item_id = state
        .queue
        .enqueue(request.destination, request.payload, request.metadata)
        .await;

    (
        StatusCode::ACCEPTED,
        Json(EnqueueResponse {
            status: "enqueued",
            item_id,
        }),
    )
        .into_response()
}

/// Send an SMS immediately with retries, bypassing the queue.
pub async fn send_direct(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<NotificationRequest>,
) -> Response {
    if !is_authorized(&headers, state.config.api_token.as_deref()) {
        return unauthorized();
    }

    info!(
        destination = %request.destination,
        payload_length = request.payload.len(),
        "direct_send_received"
    );

    match send_with_retry(state.provider.as_ref(), &request.destination, &request.payload).await {
        Ok(receipt) => (
            StatusCode::OK,
            Json(DirectSendResponse {
                status: "sent",
                receipt,
            }),
        )
            .into_response(),
        Err(e) => {
            error!(destination = %request.destination, error = %e, "direct_send_failed");
            (
                StatusCode::BAD_GATEWAY,
                Json(ErrorResponse {
                    status: "error",
                    error: e.to_string(),
                }),
            )
                .into_response()
        }
    }
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(ErrorResponse {
            status: "unauthorized",
            error: "missing or invalid API key".to_string(),
        }),
    )
        .into_response()
}

/// Check the API key header against the configured token.
///
/// With no token configured every request passes.
fn is_authorized(headers: &HeaderMap, expected: Option<&str>) -> bool {
    let provided = headers.get(API_KEY_HEADER).and_then(|v| v.to_str().ok());

    match (provided, expected) {
        (Some(provided), Some(expected)) if provided == expected => true,
        (None, Some(_)) => {
            warn!("api_key_missing");
            false
        }
        (Some(_), Some(_)) => {
            warn!("api_key_invalid");
            false
        }
        (_, None) => {
            debug!("api_key_not_configured");
            true
        }
    }
}
