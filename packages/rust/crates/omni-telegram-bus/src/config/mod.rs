//! Config namespace: bot discovery, gateway runtime config, settings files.

mod bots;
mod gateway;
mod settings;

pub use bots::{BOT_ENV_PREFIX, BotIdentity, BotRegistry, normalize_bot_name};
pub use gateway::{
    GATEWAY_MODE_ENV, GatewayConfig, GatewayOverrides, IngestionMode, NATS_URL_ENV, PORT_ENV,
    POLL_RETRY_SECS_ENV, POLL_TIMEOUT_SECS_ENV, SHUTDOWN_TIMEOUT_SECS_ENV, SUBJECT_PREFIX_ENV,
    TELEGRAM_API_BASE_URL_ENV, WEBHOOK_BASE_URL_ENV, WEBHOOK_SECRET_ENV,
};
pub use settings::{
    GatewaySettings, RuntimeSettings, load_runtime_settings, load_runtime_settings_from_paths,
    runtime_settings_paths, set_config_home_override,
};
