use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use omni_telegram_bus::{GatewayOverrides, IngestionMode};

#[derive(Parser)]
#[command(name = "omni-telegram-bus")]
#[command(
    about = "Bridge Telegram bots onto NATS: updates in, Bot API calls out. Bots come from BOT_<NAME>=<token>."
)]
pub(crate) struct Cli {
    /// Override config directory holding `omni-telegram-bus/settings.yaml`.
    #[arg(long)]
    pub(crate) conf: Option<PathBuf>,

    /// Ingestion mode (default: webhook when a base URL is set, else polling)
    #[arg(long, value_enum)]
    pub(crate) mode: Option<ModeArg>,

    /// NATS server URL (default: nats://localhost:4222)
    #[arg(long)]
    pub(crate) nats_url: Option<String>,

    /// Externally reachable base URL; callbacks go to `<base>/webhook/<bot>`
    #[arg(long)]
    pub(crate) webhook_base_url: Option<String>,

    /// Listen address (default: 0.0.0.0:$PORT, PORT defaults to 8080)
    #[arg(long)]
    pub(crate) bind: Option<String>,

    /// Shared secret expected in `X-Telegram-Bot-Api-Secret-Token`
    #[arg(long)]
    pub(crate) webhook_secret: Option<String>,

    /// Root subject segment (default: telegram)
    #[arg(long)]
    pub(crate) subject_prefix: Option<String>,

    /// Debug logging for this crate (ignored when RUST_LOG is set)
    #[arg(long, short)]
    pub(crate) verbose: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub(crate) enum ModeArg {
    Webhook,
    Polling,
}

impl From<ModeArg> for IngestionMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Webhook => Self::Webhook,
            ModeArg::Polling => Self::Polling,
        }
    }
}

impl Cli {
    pub(crate) fn overrides(&self) -> GatewayOverrides {
        GatewayOverrides {
            nats_url: self.nats_url.clone(),
            mode: self.mode.map(IngestionMode::from),
            webhook_base_url: self.webhook_base_url.clone(),
            bind: self.bind.clone(),
            webhook_secret: self.webhook_secret.clone(),
            subject_prefix: self.subject_prefix.clone(),
        }
    }
}
