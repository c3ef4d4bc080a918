//! Telegram Bot API ↔ NATS gateway.
//!
//! - Incoming updates (webhook push or long-poll pull) are published to
//!   `<prefix>.<bot>.in.update` plus one type-scoped subject.
//! - Messages on `<prefix>.<bot>.out.<method>` become Bot API calls; requests
//!   get the raw platform response (or `{"error": ...}`) as the reply.

#![allow(missing_docs)]

mod bus;
mod channels;
mod config;
mod error;
mod gateway;
#[doc(hidden)]
pub mod test_support;

pub use bus::{
    BusError, BusMessage, BusSubscription, MessageBus, NatsBus, ReplyAddress, subjects,
};
pub use channels::telegram::{
    ALLOWED_UPDATES, ApiCallFailed, CommandError, OutgoingCommand, OutgoingDispatcher,
    PollIngestor, PollPolicy, TelegramApi, TelegramApiClient, Update, UpdateKind, UpdatePayload,
    UpdateRouter, WebhookRegistration, WebhookState, build_health_app, build_webhook_app,
    deregister_all, register_until_done,
};
pub use config::{
    BOT_ENV_PREFIX, BotIdentity, BotRegistry, GATEWAY_MODE_ENV, GatewayConfig, GatewayOverrides,
    GatewaySettings, IngestionMode, NATS_URL_ENV, PORT_ENV, POLL_RETRY_SECS_ENV,
    POLL_TIMEOUT_SECS_ENV, RuntimeSettings, SHUTDOWN_TIMEOUT_SECS_ENV, SUBJECT_PREFIX_ENV,
    TELEGRAM_API_BASE_URL_ENV, WEBHOOK_BASE_URL_ENV, WEBHOOK_SECRET_ENV, load_runtime_settings,
    load_runtime_settings_from_paths, normalize_bot_name, runtime_settings_paths,
    set_config_home_override,
};
pub use error::GatewayError;
pub use gateway::{Gateway, HttpServer, shutdown_signal, start_http_server};
