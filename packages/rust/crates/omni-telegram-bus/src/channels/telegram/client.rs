use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::CONTENT_TYPE;

use super::constants::{
    ALLOWED_UPDATES, METHOD_GET_UPDATES, TELEGRAM_DEFAULT_API_BASE,
    TELEGRAM_HTTP_CONNECT_TIMEOUT_SECS, TELEGRAM_HTTP_REQUEST_TIMEOUT_SECS,
    TELEGRAM_POLL_REQUEST_GRACE_SECS,
};
use super::error::ApiCallFailed;
use crate::config::BotIdentity;

/// One HTTP call per Bot API method. No retries at this layer.
///
/// Both operations return the full response body unparsed, whatever the HTTP
/// status; interpreting the `{ok, ...}` envelope is the caller's job.
#[async_trait]
pub trait TelegramApi: Send + Sync {
    /// POST `payload` verbatim as the JSON body of `method`.
    async fn call(
        &self,
        bot: &BotIdentity,
        method: &str,
        payload: Bytes,
    ) -> Result<Bytes, ApiCallFailed>;

    /// Long-poll `getUpdates` from `offset`, waiting up to `timeout_secs` server-side.
    async fn get_updates(
        &self,
        bot: &BotIdentity,
        offset: i64,
        timeout_secs: u64,
    ) -> Result<Bytes, ApiCallFailed>;
}

/// reqwest-backed [`TelegramApi`].
#[derive(Debug, Clone)]
pub struct TelegramApiClient {
    client: reqwest::Client,
    api_base_url: String,
}

impl Default for TelegramApiClient {
    fn default() -> Self {
        Self::new(TELEGRAM_DEFAULT_API_BASE)
    }
}

impl TelegramApiClient {
    pub fn new(api_base_url: impl Into<String>) -> Self {
        Self {
            client: build_telegram_http_client(),
            api_base_url: api_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn api_base_url(&self) -> &str {
        &self.api_base_url
    }

    fn api_url(&self, bot: &BotIdentity, method: &str) -> String {
        format!("{}/bot{}/{method}", self.api_base_url, bot.token())
    }
}

#[async_trait]
impl TelegramApi for TelegramApiClient {
    async fn call(
        &self,
        bot: &BotIdentity,
        method: &str,
        payload: Bytes,
    ) -> Result<Bytes, ApiCallFailed> {
        let response = self
            .client
            .post(self.api_url(bot, method))
            .header(CONTENT_TYPE, "application/json")
            .body(payload)
            .send()
            .await
            .map_err(|error| ApiCallFailed::from_reqwest(method, error))?;
        tracing::debug!(
            bot = %bot.name(),
            method,
            status = %response.status(),
            "telegram api call completed"
        );
        response
            .bytes()
            .await
            .map_err(|error| ApiCallFailed::from_reqwest(method, error))
    }

    async fn get_updates(
        &self,
        bot: &BotIdentity,
        offset: i64,
        timeout_secs: u64,
    ) -> Result<Bytes, ApiCallFailed> {
        let allowed_updates = serde_json::to_string(&ALLOWED_UPDATES)
            .map_err(|error| ApiCallFailed::new(METHOD_GET_UPDATES, error.to_string()))?;
        let response = self
            .client
            .get(self.api_url(bot, METHOD_GET_UPDATES))
            .query(&[
                ("offset", offset.to_string()),
                ("timeout", timeout_secs.to_string()),
                ("allowed_updates", allowed_updates),
            ])
            .timeout(Duration::from_secs(
                timeout_secs.saturating_add(TELEGRAM_POLL_REQUEST_GRACE_SECS),
            ))
            .send()
            .await
            .map_err(|error| ApiCallFailed::from_reqwest(METHOD_GET_UPDATES, error))?;
        response
            .bytes()
            .await
            .map_err(|error| ApiCallFailed::from_reqwest(METHOD_GET_UPDATES, error))
    }
}

pub(crate) fn build_telegram_http_client() -> reqwest::Client {
    match reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(TELEGRAM_HTTP_CONNECT_TIMEOUT_SECS))
        .timeout(Duration::from_secs(TELEGRAM_HTTP_REQUEST_TIMEOUT_SECS))
        .build()
    {
        Ok(client) => client,
        Err(error) => {
            tracing::warn!(
                error = %error,
                "failed to build Telegram HTTP client with timeouts; falling back to default client"
            );
            reqwest::Client::new()
        }
    }
}
