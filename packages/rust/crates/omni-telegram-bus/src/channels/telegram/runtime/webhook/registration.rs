use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures::future::join_all;
use secrecy::{ExposeSecret, SecretString};
use tokio_util::sync::CancellationToken;

use super::super::super::client::TelegramApi;
use super::super::super::constants::{ALLOWED_UPDATES, METHOD_DELETE_WEBHOOK, METHOD_SET_WEBHOOK};
use super::super::super::error::ApiResponse;
use crate::config::{BotIdentity, BotRegistry};

/// What to register for one bot.
#[derive(Clone)]
pub struct WebhookRegistration {
    pub url: String,
    pub secret_token: Option<Arc<SecretString>>,
    pub retry_delay: Duration,
}

impl WebhookRegistration {
    fn payload(&self) -> Result<Bytes, serde_json::Error> {
        let mut payload = serde_json::json!({
            "url": self.url,
            "allowed_updates": ALLOWED_UPDATES,
        });
        if let Some(secret) = &self.secret_token {
            payload["secret_token"] = serde_json::Value::from(secret.expose_secret());
        }
        serde_json::to_vec(&payload).map(Bytes::from)
    }
}

/// Call `setWebhook` until the platform accepts it or `cancel` fires.
///
/// Returns whether registration succeeded.
pub async fn register_until_done(
    api: Arc<dyn TelegramApi>,
    bot: Arc<BotIdentity>,
    registration: WebhookRegistration,
    cancel: CancellationToken,
) -> bool {
    let mut attempts: u32 = 0;
    loop {
        attempts = attempts.saturating_add(1);
        let outcome = tokio::select! {
            () = cancel.cancelled() => return false,
            outcome = register_once(api.as_ref(), &bot, &registration) => outcome,
        };
        match outcome {
            Ok(()) => {
                tracing::info!(
                    bot = %bot.name(),
                    url = %registration.url,
                    attempts,
                    "telegram webhook registered"
                );
                return true;
            }
            Err(reason) => tracing::warn!(
                bot = %bot.name(),
                attempts,
                "telegram setWebhook failed: {reason}"
            ),
        }
        tokio::select! {
            () = cancel.cancelled() => return false,
            () = tokio::time::sleep(registration.retry_delay) => {}
        }
    }
}

async fn register_once(
    api: &dyn TelegramApi,
    bot: &BotIdentity,
    registration: &WebhookRegistration,
) -> Result<(), String> {
    let payload = registration.payload().map_err(|error| error.to_string())?;
    let body = api
        .call(bot, METHOD_SET_WEBHOOK, payload)
        .await
        .map_err(|error| error.to_string())?;
    ensure_ok(&body)
}

/// Best-effort `deleteWebhook` for every bot, concurrently. Returns the failure count.
pub async fn deregister_all(api: &dyn TelegramApi, registry: &BotRegistry) -> usize {
    let results = join_all(registry.iter().map(|bot| async move {
        let outcome = match api
            .call(bot, METHOD_DELETE_WEBHOOK, Bytes::from_static(b"{}"))
            .await
        {
            Ok(body) => ensure_ok(&body),
            Err(error) => Err(error.to_string()),
        };
        match &outcome {
            Ok(()) => tracing::info!(bot = %bot.name(), "telegram webhook removed"),
            Err(reason) => tracing::warn!(
                bot = %bot.name(),
                "telegram deleteWebhook failed: {reason}"
            ),
        }
        outcome.is_ok()
    }))
    .await;
    results.into_iter().filter(|ok| !ok).count()
}

fn ensure_ok(body: &[u8]) -> Result<(), String> {
    let response = ApiResponse::parse(body).map_err(|error| format!("unreadable response: {error}"))?;
    if response.ok {
        Ok(())
    } else {
        Err(response
            .description_or("unknown Telegram API error")
            .to_string())
    }
}
