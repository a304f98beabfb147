//! HTTP surface for producers and monitoring.
//!
//! Routes:
//! - `GET  /health`
//! - `GET  /queue/status`
//! - `GET  /queue/items/:id`
//! - `POST /notifications` (enqueue)
//! - `POST /notifications/direct` (send now with retries)

pub mod handlers;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

pub use handlers::{
    enqueue_notification, health, queue_item, queue_status, send_direct, AppState,
    DirectSendResponse, EnqueueResponse, ErrorResponse, HealthResponse, NotificationRequest,
    API_KEY_HEADER,
};

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/queue/status", get(queue_status))
        .route("/queue/items/:id", get(queue_item))
        .route("/notifications", post(enqueue_notification))
        .route("/notifications/direct", post(send_direct))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
