//! omni-telegram-bus: Telegram bots ↔ NATS subjects.
//!
//! Logging: set `RUST_LOG=omni_telegram_bus=debug` (or `info`, `warn`) for logs on stderr.

mod cli;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use omni_telegram_bus::{
    BotRegistry, Gateway, GatewayConfig, NatsBus, TelegramApiClient, set_config_home_override,
    shutdown_signal,
};

use crate::cli::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let dotenv_path = dotenvy::dotenv().ok();
    let cli = Cli::parse();
    if let Some(conf_dir) = cli.conf.clone() {
        set_config_home_override(conf_dir);
    }

    // RUST_LOG overrides; --verbose => debug; else info
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if cli.verbose {
            "omni_telegram_bus=debug"
        } else {
            "omni_telegram_bus=info"
        })
    });
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
    if let Some(path) = dotenv_path {
        tracing::debug!(path = %path.display(), "loaded .env");
    }

    let config = GatewayConfig::from_env(&cli.overrides()).context("invalid gateway configuration")?;
    let registry = BotRegistry::discover().context("bot discovery failed")?;
    tracing::info!(bots = registry.len(), names = ?registry.names(), "discovered bots");

    let bus = NatsBus::connect(&config.nats_url)
        .await
        .context("failed to connect to NATS")?;
    let api = TelegramApiClient::new(config.api_base_url.clone());

    Gateway::new(config, registry, Arc::new(bus), Arc::new(api))
        .run(shutdown_signal())
        .await
}
