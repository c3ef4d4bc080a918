//! Gateway runtime configuration (bus endpoint, ingestion mode, webhook surface, polling).
//!
//! Precedence per field: CLI override, then environment, then settings YAML, then default.

use std::fmt;
use std::str::FromStr;

use secrecy::SecretString;

use super::settings::{GatewaySettings, load_runtime_settings};
use crate::error::GatewayError;

const DEFAULT_NATS_URL: &str = "nats://localhost:4222";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_SUBJECT_PREFIX: &str = "telegram";
const DEFAULT_API_BASE_URL: &str = "https://api.telegram.org";
const DEFAULT_POLL_TIMEOUT_SECS: u64 = 30;
const DEFAULT_POLL_RETRY_SECS: u64 = 5;
const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 5;

pub const NATS_URL_ENV: &str = "NATS_URL";
pub const GATEWAY_MODE_ENV: &str = "GATEWAY_MODE";
pub const WEBHOOK_BASE_URL_ENV: &str = "WEBHOOK_BASE_URL";
pub const PORT_ENV: &str = "PORT";
pub const WEBHOOK_SECRET_ENV: &str = "WEBHOOK_SECRET";
pub const SUBJECT_PREFIX_ENV: &str = "SUBJECT_PREFIX";
pub const TELEGRAM_API_BASE_URL_ENV: &str = "TELEGRAM_API_BASE_URL";
pub const POLL_TIMEOUT_SECS_ENV: &str = "POLL_TIMEOUT_SECS";
pub const POLL_RETRY_SECS_ENV: &str = "POLL_RETRY_SECS";
pub const SHUTDOWN_TIMEOUT_SECS_ENV: &str = "SHUTDOWN_TIMEOUT_SECS";

/// How updates reach the gateway. One mode per deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestionMode {
    /// Platform pushes updates to `POST /webhook/<bot>`.
    Webhook,
    /// Gateway long-polls `getUpdates` per bot.
    Polling,
}

impl FromStr for IngestionMode {
    type Err = GatewayError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "webhook" | "push" => Ok(Self::Webhook),
            "polling" | "poll" | "pull" => Ok(Self::Polling),
            other => Err(GatewayError::Configuration(format!(
                "unknown ingestion mode `{other}`; expected `webhook` or `polling`"
            ))),
        }
    }
}

impl fmt::Display for IngestionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Webhook => f.write_str("webhook"),
            Self::Polling => f.write_str("polling"),
        }
    }
}

/// Values supplied on the command line; they win over every other source.
#[derive(Debug, Clone, Default)]
pub struct GatewayOverrides {
    pub nats_url: Option<String>,
    pub mode: Option<IngestionMode>,
    pub webhook_base_url: Option<String>,
    pub bind: Option<String>,
    pub webhook_secret: Option<String>,
    pub subject_prefix: Option<String>,
}

/// Resolved, immutable gateway configuration.
#[derive(Debug)]
pub struct GatewayConfig {
    pub nats_url: String,
    pub mode: IngestionMode,
    /// Externally reachable base URL, no trailing slash. Always set in webhook mode.
    pub webhook_base_url: Option<String>,
    pub bind_addr: String,
    pub webhook_secret: Option<SecretString>,
    pub subject_prefix: String,
    pub api_base_url: String,
    pub poll_timeout_secs: u64,
    pub poll_retry_secs: u64,
    pub shutdown_timeout_secs: u64,
}

impl GatewayConfig {
    /// Resolve from CLI overrides, the process environment and settings files.
    pub fn from_env(overrides: &GatewayOverrides) -> Result<Self, GatewayError> {
        let settings = load_runtime_settings();
        Self::from_lookup(
            |name| std::env::var(name).ok(),
            overrides,
            Some(&settings.gateway),
        )
    }

    #[doc(hidden)]
    pub fn from_lookup<F>(
        lookup: F,
        overrides: &GatewayOverrides,
        settings: Option<&GatewaySettings>,
    ) -> Result<Self, GatewayError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let nats_url = resolve_string(
            overrides.nats_url.clone(),
            &lookup,
            NATS_URL_ENV,
            settings.and_then(|s| s.nats_url.clone()),
        )
        .unwrap_or_else(|| DEFAULT_NATS_URL.to_string());

        let webhook_base_url = resolve_string(
            overrides.webhook_base_url.clone(),
            &lookup,
            WEBHOOK_BASE_URL_ENV,
            settings.and_then(|s| s.webhook_base_url.clone()),
        )
        .map(|url| url.trim_end_matches('/').to_string())
        .filter(|url| !url.is_empty());

        let mode = match overrides.mode {
            Some(mode) => mode,
            None => match resolve_string(
                None,
                &lookup,
                GATEWAY_MODE_ENV,
                settings.and_then(|s| s.mode.clone()),
            ) {
                Some(raw) => raw.parse()?,
                None if webhook_base_url.is_some() => IngestionMode::Webhook,
                None => IngestionMode::Polling,
            },
        };
        if mode == IngestionMode::Webhook && webhook_base_url.is_none() {
            return Err(GatewayError::Configuration(format!(
                "{WEBHOOK_BASE_URL_ENV} is required in webhook mode"
            )));
        }

        let bind_addr = resolve_bind(overrides.bind.as_deref(), &lookup, settings);

        let webhook_secret = resolve_string(
            overrides.webhook_secret.clone(),
            &lookup,
            WEBHOOK_SECRET_ENV,
            settings.and_then(|s| s.webhook_secret.clone()),
        )
        .map(SecretString::from);

        let subject_prefix = resolve_string(
            overrides.subject_prefix.clone(),
            &lookup,
            SUBJECT_PREFIX_ENV,
            settings.and_then(|s| s.subject_prefix.clone()),
        )
        .unwrap_or_else(|| DEFAULT_SUBJECT_PREFIX.to_string());
        validate_subject_prefix(&subject_prefix)?;

        let api_base_url = resolve_string(
            None,
            &lookup,
            TELEGRAM_API_BASE_URL_ENV,
            settings.and_then(|s| s.api_base_url.clone()),
        )
        .map(|url| url.trim_end_matches('/').to_string())
        .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());

        Ok(Self {
            nats_url,
            mode,
            webhook_base_url,
            bind_addr,
            webhook_secret,
            subject_prefix,
            api_base_url,
            poll_timeout_secs: resolve_u64(
                &lookup,
                POLL_TIMEOUT_SECS_ENV,
                settings.and_then(|s| s.poll_timeout_secs),
                DEFAULT_POLL_TIMEOUT_SECS,
            ),
            poll_retry_secs: resolve_u64(
                &lookup,
                POLL_RETRY_SECS_ENV,
                settings.and_then(|s| s.poll_retry_secs),
                DEFAULT_POLL_RETRY_SECS,
            ),
            shutdown_timeout_secs: resolve_u64(
                &lookup,
                SHUTDOWN_TIMEOUT_SECS_ENV,
                settings.and_then(|s| s.shutdown_timeout_secs),
                DEFAULT_SHUTDOWN_TIMEOUT_SECS,
            ),
        })
    }

    /// Callback URL registered with the platform for `bot_name`.
    pub fn webhook_url(&self, bot_name: &str) -> Option<String> {
        self.webhook_base_url
            .as_deref()
            .map(|base| format!("{base}/webhook/{bot_name}"))
    }
}

fn resolve_string<F>(
    override_value: Option<String>,
    lookup: &F,
    name: &str,
    setting_value: Option<String>,
) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    override_value
        .or_else(|| lookup(name))
        .or(setting_value)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// CLI bind, then env `PORT`, then settings `bind`, then settings `port`, then default.
fn resolve_bind<F>(
    override_bind: Option<&str>,
    lookup: &F,
    settings: Option<&GatewaySettings>,
) -> String
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(bind) = non_blank(override_bind) {
        return bind.to_string();
    }
    if let Some(port) = env_port(lookup) {
        return format!("0.0.0.0:{port}");
    }
    if let Some(bind) = non_blank(settings.and_then(|s| s.bind.as_deref())) {
        return bind.to_string();
    }
    let port = settings
        .and_then(|s| s.port)
        .filter(|port| *port > 0)
        .unwrap_or(DEFAULT_PORT);
    format!("0.0.0.0:{port}")
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

fn env_port<F>(lookup: &F) -> Option<u16>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(PORT_ENV)?;
    match raw.trim().parse::<u16>() {
        Ok(port) if port > 0 => Some(port),
        _ => {
            tracing::warn!(
                env_var = PORT_ENV,
                value = %raw,
                "invalid port env value; using settings/default"
            );
            None
        }
    }
}

fn resolve_u64<F>(lookup: &F, name: &str, setting_value: Option<u64>, default: u64) -> u64
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(raw) = lookup(name) {
        match raw.trim().parse::<u64>() {
            Ok(value) if value > 0 => return value,
            _ => tracing::warn!(
                env_var = %name,
                value = %raw,
                "invalid gateway config env value; using settings/default"
            ),
        }
    }
    match setting_value {
        Some(value) if value > 0 => value,
        Some(value) => {
            tracing::warn!(
                setting = %name,
                value,
                default,
                "invalid gateway config settings value; using default"
            );
            default
        }
        None => default,
    }
}

fn validate_subject_prefix(prefix: &str) -> Result<(), GatewayError> {
    let invalid = prefix.starts_with('.')
        || prefix.ends_with('.')
        || prefix.contains("..")
        || prefix
            .chars()
            .any(|c| c.is_whitespace() || c == '*' || c == '>');
    if invalid {
        return Err(GatewayError::Configuration(format!(
            "subject prefix `{prefix}` is not a valid literal subject"
        )));
    }
    Ok(())
}
