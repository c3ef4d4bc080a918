use axum::http::HeaderMap;
use secrecy::{ExposeSecret, SecretString};
use subtle::ConstantTimeEq;

use super::super::super::constants::TELEGRAM_WEBHOOK_SECRET_HEADER;
use crate::error::GatewayError;

/// Accept when no secret is configured; otherwise the header must match exactly.
pub(super) fn validate_secret_token(
    headers: &HeaderMap,
    expected_secret: Option<&SecretString>,
) -> Result<(), GatewayError> {
    let Some(expected) = expected_secret else {
        return Ok(());
    };
    let provided = headers
        .get(TELEGRAM_WEBHOOK_SECRET_HEADER)
        .map(|value| value.as_bytes())
        .unwrap_or_default();
    if bool::from(provided.ct_eq(expected.expose_secret().as_bytes())) {
        Ok(())
    } else {
        Err(GatewayError::Auth("invalid telegram webhook secret token".to_string()))
    }
}
