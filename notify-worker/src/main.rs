//! Front Desk notify - HTTP service in front of the SMS delivery queue.
//!
//! Accepts outbound SMS requests, delivers them through a single rate-limited
//! worker, and exposes queue status for monitoring.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::{net::TcpListener, signal};
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use frontdesk::provider::{DryRunProvider, SmsProvider, TwilioProvider};
use frontdesk::{web, AppState, Config, DeliveryQueue};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize structured JSON logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().flatten_event(true))
        .init();

    info!("notify_service_starting");

    // Load configuration from environment
    let config = Config::from_env();
    info!(
        port = config.port,
        api_token_configured = config.api_token.is_some(),
        twilio_configured = config.twilio_configured(),
        rate_limit = config.sms_rate_limit,
        rate_window_ms = config.sms_rate_window_ms,
        max_retries = config.sms_max_retries,
        retry_delays_ms = ?config.sms_retry_delays_ms,
        "config_loaded"
    );

    if config.api_token.is_none() {
        warn!("api_key_not_configured_write_routes_open");
    }

    let provider = build_provider(&config)?;
    let queue = DeliveryQueue::new(config.queue_config(), provider.clone());
    info!(provider = provider.name(), "delivery_queue_created");

    let state = AppState::new(config.clone(), queue.clone(), provider);
    let app = web::router(state);

    // Bind to address
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!(address = %addr, "notify_service_listening");

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    // The queue lives in memory only
    let status = queue.status().await;
    if status.pending_count > 0 {
        warn!(
            pending_count = status.pending_count,
            "delivery_queue_dropped_on_shutdown"
        );
    }

    info!(
        sent_count = status.sent_count,
        failed_count = status.failed_count,
        "notify_service_shutdown_complete"
    );

    Ok(())
}

/// Twilio when fully configured, otherwise a provider that only logs.
fn build_provider(config: &Config) -> Result<Arc<dyn SmsProvider>> {
    match (
        &config.twilio_account_sid,
        &config.twilio_auth_token,
        &config.twilio_from_number,
    ) {
        (Some(sid), Some(token), Some(from)) => {
            let twilio = TwilioProvider::new(
                config.twilio_api_base.clone(),
                sid.clone(),
                token.clone(),
                from.clone(),
                config.request_timeout(),
            )
            .context("Failed to create Twilio provider")?;
            Ok(Arc::new(twilio))
        }
        _ => {
            warn!("twilio_not_configured_using_dry_run");
            Ok(Arc::new(DryRunProvider::new()))
        }
    }
}

/// Create a future that completes when a shutdown signal is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "ctrl_c_handler_failed");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "sigterm_handler_failed");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }

    info!("notify_service_shutting_down");
}
