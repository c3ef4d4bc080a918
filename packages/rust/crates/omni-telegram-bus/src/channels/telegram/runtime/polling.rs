//! Pull-mode ingestion: one `getUpdates` loop per bot.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use serde_json::value::RawValue;
use tokio_util::sync::CancellationToken;

use super::super::client::TelegramApi;
use super::super::constants::{
    METHOD_DELETE_WEBHOOK, TELEGRAM_POLL_CONFLICT_RETRY_SECS,
    TELEGRAM_POLL_DEFAULT_RATE_LIMIT_RETRY_SECS, TELEGRAM_POLL_MAX_RATE_LIMIT_RETRY_SECS,
};
use super::super::error::ApiResponse;
use super::super::router::UpdateRouter;
use super::super::update::Update;
use crate::config::{BotIdentity, GatewayConfig};

/// Timing knobs of the poll loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Server-side long-poll wait.
    pub timeout_secs: u64,
    /// Backoff after transport, decode and generic API failures.
    pub retry_delay: Duration,
    /// Backoff after a 409 conflict.
    pub conflict_delay: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            retry_delay: Duration::from_secs(5),
            conflict_delay: Duration::from_secs(TELEGRAM_POLL_CONFLICT_RETRY_SECS),
        }
    }
}

impl PollPolicy {
    pub fn from_config(config: &GatewayConfig) -> Self {
        Self {
            timeout_secs: config.poll_timeout_secs,
            retry_delay: Duration::from_secs(config.poll_retry_secs),
            ..Self::default()
        }
    }

    /// Backoff for a platform-reported failure.
    pub fn failure_delay(&self, error_code: Option<i64>, retry_after_secs: Option<u64>) -> Duration {
        match error_code {
            Some(429) => Duration::from_secs(
                retry_after_secs
                    .unwrap_or(TELEGRAM_POLL_DEFAULT_RATE_LIMIT_RETRY_SECS)
                    .clamp(1, TELEGRAM_POLL_MAX_RATE_LIMIT_RETRY_SECS),
            ),
            Some(409) => self.conflict_delay,
            _ => self.retry_delay,
        }
    }
}

enum PollStep {
    /// Batch handled; carries the number of updates routed.
    Batch(usize),
    Backoff(Duration),
}

/// Long-poll loop for one bot. Owns the bot's cursor.
pub struct PollIngestor {
    bot: Arc<BotIdentity>,
    api: Arc<dyn TelegramApi>,
    router: UpdateRouter,
    policy: PollPolicy,
}

impl PollIngestor {
    pub fn new(
        bot: Arc<BotIdentity>,
        api: Arc<dyn TelegramApi>,
        router: UpdateRouter,
        policy: PollPolicy,
    ) -> Self {
        Self {
            bot,
            api,
            router,
            policy,
        }
    }

    /// Poll until `cancel` fires; never returns on error. Returns the final cursor.
    ///
    /// Cancellation interrupts the in-flight long-poll and any backoff sleep,
    /// but never a batch that is being routed.
    pub async fn run(self, cancel: CancellationToken) -> i64 {
        let bot = self.bot.name().to_string();
        let mut offset: i64 = 0;
        let mut consecutive_failures: u32 = 0;

        tokio::select! {
            () = cancel.cancelled() => return offset,
            () = self.clear_webhook() => {}
        }
        tracing::info!(bot = %bot, timeout_secs = self.policy.timeout_secs, "telegram poll loop started");

        while !cancel.is_cancelled() {
            let fetched = tokio::select! {
                () = cancel.cancelled() => break,
                fetched = self.api.get_updates(&self.bot, offset, self.policy.timeout_secs) => fetched,
            };
            let step = match fetched {
                Ok(body) => self.handle_response(&body, &mut offset).await,
                Err(error) => {
                    tracing::warn!(bot = %bot, offset, error = %error, "telegram poll error");
                    PollStep::Backoff(self.policy.retry_delay)
                }
            };
            match step {
                PollStep::Batch(routed) => {
                    if consecutive_failures > 0 {
                        tracing::info!(bot = %bot, consecutive_failures, "telegram polling recovered");
                    }
                    consecutive_failures = 0;
                    if routed > 0 {
                        tracing::debug!(bot = %bot, routed, offset, "telegram batch routed");
                    }
                }
                PollStep::Backoff(delay) => {
                    consecutive_failures = consecutive_failures.saturating_add(1);
                    tracing::debug!(
                        bot = %bot,
                        consecutive_failures,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        "telegram poll backing off"
                    );
                    tokio::select! {
                        () = cancel.cancelled() => break,
                        () = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }

        tracing::info!(bot = %bot, offset, "telegram poll loop stopped");
        offset
    }

    async fn handle_response(&self, body: &[u8], offset: &mut i64) -> PollStep {
        let bot = self.bot.name();
        let response = match ApiResponse::parse(body) {
            Ok(response) => response,
            Err(error) => {
                tracing::warn!(bot, offset = *offset, error = %error, "telegram getUpdates parse error");
                return PollStep::Backoff(self.policy.retry_delay);
            }
        };

        if !response.ok {
            let description = response.description_or("unknown Telegram API error");
            match response.error_code {
                Some(code @ (401 | 403)) => tracing::error!(
                    bot,
                    error_code = code,
                    "telegram getUpdates rejected the bot credential: {description}"
                ),
                Some(409) => tracing::warn!(
                    bot,
                    "telegram polling conflict (409): {description}. \
Ensure only one process is using this bot token."
                ),
                Some(429) => tracing::warn!(
                    bot,
                    retry_after_secs = ?response.retry_after_secs(),
                    "telegram getUpdates rate limited (429): {description}"
                ),
                code => tracing::warn!(
                    bot,
                    error_code = ?code,
                    "telegram getUpdates API error: {description}"
                ),
            }
            return PollStep::Backoff(
                self.policy
                    .failure_delay(response.error_code, response.retry_after_secs()),
            );
        }

        let Some(result) = response.result else {
            tracing::warn!(bot, "telegram getUpdates reply carries no result");
            return PollStep::Backoff(self.policy.retry_delay);
        };
        let entries: Vec<Box<RawValue>> = match serde_json::from_str(result.get()) {
            Ok(entries) => entries,
            Err(error) => {
                tracing::warn!(bot, error = %error, "telegram getUpdates result is not a list");
                return PollStep::Backoff(self.policy.retry_delay);
            }
        };

        let received = entries.len();
        let mut routed = 0;
        for entry in entries {
            let update = match Update::from_raw(entry) {
                Ok(update) => update,
                Err(error) => {
                    tracing::warn!(bot, error = %error, "skipping malformed telegram update");
                    continue;
                }
            };
            *offset = (*offset).max(update.update_id().saturating_add(1));
            self.router.route(bot, &update).await;
            routed += 1;
        }
        if received > 0 && routed == 0 {
            // Nothing moved the cursor, so the platform would resend the same batch.
            tracing::warn!(bot, received, "telegram batch had no usable updates");
            return PollStep::Backoff(self.policy.retry_delay);
        }
        PollStep::Batch(routed)
    }

    /// A registered webhook makes the platform refuse `getUpdates` with 409.
    async fn clear_webhook(&self) {
        let bot = self.bot.name();
        match self
            .api
            .call(&self.bot, METHOD_DELETE_WEBHOOK, Bytes::from_static(b"{}"))
            .await
        {
            Ok(body) => match ApiResponse::parse(&body) {
                Ok(response) if response.ok => {
                    tracing::debug!(bot, "cleared webhook before polling");
                }
                Ok(response) => tracing::warn!(
                    bot,
                    "deleteWebhook before polling failed: {}",
                    response.description_or("unknown Telegram API error")
                ),
                Err(error) => {
                    tracing::warn!(bot, error = %error, "deleteWebhook returned an unreadable body");
                }
            },
            Err(error) => {
                tracing::warn!(bot, error = %error, "deleteWebhook before polling failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limit_delay_is_clamped() {
        let policy = PollPolicy::default();
        assert_eq!(
            policy.failure_delay(Some(429), Some(7)),
            Duration::from_secs(7)
        );
        assert_eq!(policy.failure_delay(Some(429), None), Duration::from_secs(1));
        assert_eq!(
            policy.failure_delay(Some(429), Some(600)),
            Duration::from_secs(60)
        );
        assert_eq!(policy.failure_delay(Some(429), Some(0)), Duration::from_secs(1));
    }

    #[test]
    fn conflict_and_generic_failures_use_policy_delays() {
        let policy = PollPolicy {
            timeout_secs: 1,
            retry_delay: Duration::from_millis(30),
            conflict_delay: Duration::from_millis(20),
        };
        assert_eq!(policy.failure_delay(Some(409), None), Duration::from_millis(20));
        assert_eq!(policy.failure_delay(Some(500), None), Duration::from_millis(30));
        assert_eq!(policy.failure_delay(None, None), Duration::from_millis(30));
    }
}
