use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};

use super::super::super::update::Update;
use super::auth::validate_secret_token;
use super::state::WebhookState;
use crate::error::GatewayError;

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::Auth(_) => StatusCode::UNAUTHORIZED,
            Self::Protocol(_) => StatusCode::BAD_REQUEST,
            Self::Configuration(_) | Self::Transport(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, self.to_string()).into_response()
    }
}

/// `POST /webhook/{bot}`: 404 unknown bot, 401 bad secret, 400 bad body, else route and 200.
pub(super) async fn telegram_webhook_handler(
    State(state): State<WebhookState>,
    Path(bot): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, Response> {
    if bot.is_empty() {
        return Err(missing_bot_name().into_response());
    }
    let Some(identity) = state.registry.get(&bot) else {
        tracing::debug!(bot = %bot, "webhook for unknown bot");
        return Err((StatusCode::NOT_FOUND, format!("unknown bot `{bot}`")).into_response());
    };

    if let Err(rejection) = validate_secret_token(&headers, state.secret_token.as_deref()) {
        tracing::warn!(bot = %identity.name(), "webhook secret token mismatch");
        return Err(rejection.into_response());
    }

    let update = Update::from_slice(&body).map_err(|error| {
        tracing::warn!(bot = %identity.name(), error = %error, "rejecting malformed webhook body");
        error.into_response()
    })?;
    tracing::debug!(
        bot = %identity.name(),
        update_id = update.update_id(),
        "webhook received telegram update"
    );

    state.router.route(identity.name(), &update).await;
    Ok(StatusCode::OK)
}

/// `POST /webhook/` with no bot segment.
pub(super) async fn missing_bot_handler() -> (StatusCode, String) {
    missing_bot_name()
}

pub(super) async fn health_handler() -> &'static str {
    "ok"
}

fn missing_bot_name() -> (StatusCode, String) {
    (StatusCode::BAD_REQUEST, "missing bot name".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_classes_map_to_http_statuses() {
        let cases = [
            (GatewayError::Auth("bad secret".into()), StatusCode::UNAUTHORIZED),
            (GatewayError::Protocol("not json".into()), StatusCode::BAD_REQUEST),
            (
                GatewayError::Transport("down".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (error, status) in cases {
            assert_eq!(error.into_response().status(), status);
        }
    }
}
