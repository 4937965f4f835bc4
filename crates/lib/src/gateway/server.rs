//! HTTP server: health probes, favicon no-op, and the Telegram webhook receiver.

use crate::channels::{HttpTelegramApi, TelegramApi, TelegramUpdate};
use crate::config::{RegistrationPolicy, Settings};
use crate::llm;
use crate::relay::{Relay, RelayOutcome};
use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Shared state for request handlers.
#[derive(Clone)]
pub struct GatewayState {
    pub relay: Relay,
}

/// Where and how the webhook is registered at startup.
#[derive(Debug, Clone)]
pub struct WebhookRegistration {
    pub url: String,
    pub drop_pending_updates: bool,
    pub policy: RegistrationPolicy,
}

impl WebhookRegistration {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            url: settings.webhook_url.clone(),
            drop_pending_updates: settings.drop_pending_updates,
            policy: settings.registration,
        }
    }
}

/// Route table. Exposed so it can be exercised without binding a socket.
pub fn build_router(state: GatewayState) -> Router {
    Router::new()
        .route("/", get(health_http).head(health_head))
        .route("/favicon.ico", get(favicon))
        .route("/webhook", post(telegram_webhook))
        .with_state(state)
}

/// Build the Telegram and LLM clients from settings, bind, register the webhook, and serve until SIGINT/SIGTERM.
pub async fn run_server(settings: Settings) -> Result<()> {
    let telegram = HttpTelegramApi::new(
        settings.bot_token.clone(),
        settings.telegram_api_base.clone(),
        settings.telegram_timeout,
    )
    .context("building telegram client")?;
    let provider = llm::build_provider(&settings).context("building llm client")?;
    let relay = Relay::new(provider, Arc::new(telegram));

    let bind_addr = format!("{}:{}", settings.bind, settings.port);
    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding to {}", bind_addr))?;
    log::info!("relay listening on {}", bind_addr);

    serve(
        listener,
        relay,
        &WebhookRegistration::from_settings(&settings),
        shutdown_signal(),
    )
    .await
}

/// Register the webhook once, then serve on an already-bound listener until `shutdown` completes.
/// Registration happens before the first request is accepted.
pub async fn serve<F>(
    listener: TcpListener,
    relay: Relay,
    registration: &WebhookRegistration,
    shutdown: F,
) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    register_on_startup(relay.telegram().as_ref(), registration).await?;

    let app = build_router(GatewayState { relay });
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .context("relay server exited")?;
    log::info!("relay stopped");
    Ok(())
}

/// Delete then set the webhook. With [`RegistrationPolicy::Required`] a failure aborts startup;
/// with [`RegistrationPolicy::BestEffort`] it is logged and startup continues.
pub async fn register_on_startup(
    telegram: &dyn TelegramApi,
    registration: &WebhookRegistration,
) -> Result<()> {
    match telegram
        .register_webhook(&registration.url, registration.drop_pending_updates)
        .await
    {
        Ok(()) => {
            log::info!("webhook set to {}", registration.url);
            Ok(())
        }
        Err(e) => match registration.policy {
            RegistrationPolicy::Required => {
                Err(e).with_context(|| format!("registering webhook {}", registration.url))
            }
            RegistrationPolicy::BestEffort => {
                log::warn!("webhook registration failed, continuing: {}", e);
                Ok(())
            }
        },
    }
}

/// Future that completes on SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    log::info!("shutdown signal received, draining connections");
}

/// GET / — liveness probe. Never touches Telegram or the provider.
async fn health_http() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// HEAD / — same liveness answer, no body.
async fn health_head() -> StatusCode {
    StatusCode::OK
}

/// GET /favicon.ico — 204 so browser probes don't hit the 404 path.
async fn favicon() -> StatusCode {
    StatusCode::NO_CONTENT
}

/// POST /webhook — parse the update and relay it. 200 `{"ok": true}` unless parsing or an adapter fails.
async fn telegram_webhook(State(state): State<GatewayState>, body: Bytes) -> Response {
    let update: TelegramUpdate = match serde_json::from_slice(&body) {
        Ok(u) => u,
        Err(e) => {
            log::warn!("bad update: {}", e);
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "ok": false, "error": "bad_request" })),
            )
                .into_response();
        }
    };
    match state.relay.handle_update(&update).await {
        Ok(RelayOutcome::Ignored) | Ok(RelayOutcome::Replied { .. }) => {
            Json(json!({ "ok": true })).into_response()
        }
        Err(e) => {
            log::error!("update {}: {} error: {}", update.update_id, e.kind(), e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "ok": false, "error": e.kind() })),
            )
                .into_response()
        }
    }
}
