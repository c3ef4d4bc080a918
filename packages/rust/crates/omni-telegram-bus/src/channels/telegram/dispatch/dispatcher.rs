use std::sync::Arc;

use bytes::Bytes;
use futures::StreamExt;
use tokio_util::sync::CancellationToken;

use super::command::OutgoingCommand;
use crate::bus::{BusError, BusMessage, BusSubscription, MessageBus, ReplyAddress, subjects};
use crate::channels::telegram::client::TelegramApi;
use crate::config::BotIdentity;
use crate::error::GatewayError;

/// Per-bot consumer of `<prefix>.<bot>.out.>`.
pub struct OutgoingDispatcher {
    bot: Arc<BotIdentity>,
    bus: Arc<dyn MessageBus>,
    api: Arc<dyn TelegramApi>,
    subject_prefix: String,
}

impl OutgoingDispatcher {
    pub fn new(
        bot: Arc<BotIdentity>,
        bus: Arc<dyn MessageBus>,
        api: Arc<dyn TelegramApi>,
        subject_prefix: impl Into<String>,
    ) -> Self {
        Self {
            bot,
            bus,
            api,
            subject_prefix: subject_prefix.into(),
        }
    }

    pub fn bot_name(&self) -> &str {
        self.bot.name()
    }

    pub fn subject_pattern(&self) -> String {
        subjects::outbound_pattern(&self.subject_prefix, self.bot.name())
    }

    pub async fn subscribe(&self) -> Result<BusSubscription, BusError> {
        self.bus.subscribe(self.subject_pattern()).await
    }

    /// Handle messages one at a time until cancelled or the subscription ends.
    ///
    /// Cancellation is only observed between messages, so an in-flight call
    /// and its reply always complete.
    pub async fn run(self, mut subscription: BusSubscription, cancel: CancellationToken) {
        let bot = self.bot.name().to_string();
        tracing::info!(bot = %bot, pattern = %self.subject_pattern(), "outgoing dispatcher started");
        loop {
            let message = tokio::select! {
                () = cancel.cancelled() => break,
                message = subscription.next() => message,
            };
            let Some(message) = message else {
                tracing::warn!(bot = %bot, "outgoing subscription closed");
                break;
            };
            if let Err(error) = self.handle(message).await {
                tracing::warn!(bot = %bot, error = %error, "outgoing command failed");
            }
        }
        tracing::info!(bot = %bot, "outgoing dispatcher stopped");
    }

    /// Execute one bus message. Errors are already reported to the reply
    /// address, if any, when this returns.
    pub async fn handle(&self, message: BusMessage) -> Result<(), GatewayError> {
        let BusMessage {
            subject,
            payload,
            reply,
        } = message;
        let command = match OutgoingCommand::parse(&subject, payload, reply.clone()) {
            Ok(command) => command,
            Err(error) => {
                self.reply_error(reply.as_ref(), &error.to_string()).await;
                return Err(error.into());
            }
        };

        tracing::debug!(
            bot = %self.bot.name(),
            method = %command.method,
            subject = %subject,
            has_reply = command.reply.is_some(),
            "dispatching outgoing command"
        );

        match self
            .api
            .call(&self.bot, &command.method, command.payload)
            .await
        {
            Ok(response) => {
                match command.reply.as_ref() {
                    Some(address) => self.send_reply(address, response).await,
                    None => tracing::debug!(
                        bot = %self.bot.name(),
                        method = %command.method,
                        bytes = response.len(),
                        "discarding response of fire-and-forget command"
                    ),
                }
                Ok(())
            }
            Err(error) => {
                self.reply_error(command.reply.as_ref(), &format!("API error: {error}"))
                    .await;
                Err(error.into())
            }
        }
    }

    async fn reply_error(&self, reply: Option<&ReplyAddress>, description: &str) {
        let Some(address) = reply else {
            return;
        };
        let body = serde_json::json!({ "error": description }).to_string();
        self.send_reply(address, Bytes::from(body)).await;
    }

    async fn send_reply(&self, address: &ReplyAddress, payload: Bytes) {
        if let Err(error) = self.bus.reply(address, payload).await {
            tracing::warn!(
                bot = %self.bot.name(),
                reply = %address.as_str(),
                error = %error,
                "failed to publish reply"
            );
        }
    }
}
