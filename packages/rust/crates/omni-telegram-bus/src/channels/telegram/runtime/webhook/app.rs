use std::time::Duration;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::{get, post};
use tower_http::timeout::TimeoutLayer;

use super::super::super::constants::TELEGRAM_WEBHOOK_REQUEST_TIMEOUT_SECS;
use super::handler::{health_handler, missing_bot_handler, telegram_webhook_handler};
use super::state::WebhookState;

/// Liveness only; served in polling mode.
pub fn build_health_app() -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .layer(request_timeout())
}

/// Webhook endpoints plus liveness. Non-POST on webhook paths yields 405.
pub fn build_webhook_app(state: WebhookState) -> Router {
    let webhook = Router::new()
        .route("/webhook/{bot}", post(telegram_webhook_handler))
        .route("/webhook/", post(missing_bot_handler))
        .with_state(state);

    Router::new()
        .route("/health", get(health_handler))
        .merge(webhook)
        .layer(request_timeout())
}

fn request_timeout() -> TimeoutLayer {
    TimeoutLayer::with_status_code(
        StatusCode::REQUEST_TIMEOUT,
        Duration::from_secs(TELEGRAM_WEBHOOK_REQUEST_TIMEOUT_SECS),
    )
}
