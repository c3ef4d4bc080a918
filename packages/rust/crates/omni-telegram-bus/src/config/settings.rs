//! Runtime settings loader for omni-telegram-bus.
//!
//! Loads and merges:
//! - System defaults: `<PRJ_ROOT>/packages/conf/settings.yaml`
//! - User overrides:  `<PRJ_CONFIG_HOME>/omni-telegram-bus/settings.yaml`
//!
//! Merge precedence is user over system.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use serde::Deserialize;

const DEFAULT_SYSTEM_SETTINGS_RELATIVE_PATH: &str = "packages/conf/settings.yaml";
const DEFAULT_USER_SETTINGS_RELATIVE_PATH: &str = "omni-telegram-bus/settings.yaml";
const DEFAULT_CONFIG_HOME_RELATIVE_PATH: &str = ".config";
static CONFIG_HOME_OVERRIDE: OnceLock<PathBuf> = OnceLock::new();

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RuntimeSettings {
    #[serde(default)]
    pub gateway: GatewaySettings,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GatewaySettings {
    pub nats_url: Option<String>,
    pub mode: Option<String>,
    pub webhook_base_url: Option<String>,
    pub port: Option<u16>,
    pub bind: Option<String>,
    pub webhook_secret: Option<String>,
    pub subject_prefix: Option<String>,
    pub api_base_url: Option<String>,
    pub poll_timeout_secs: Option<u64>,
    pub poll_retry_secs: Option<u64>,
    pub shutdown_timeout_secs: Option<u64>,
}

impl RuntimeSettings {
    fn merge(self, overlay: Self) -> Self {
        Self {
            gateway: self.gateway.merge(overlay.gateway),
        }
    }
}

impl GatewaySettings {
    fn merge(self, overlay: Self) -> Self {
        Self {
            nats_url: overlay.nats_url.or(self.nats_url),
            mode: overlay.mode.or(self.mode),
            webhook_base_url: overlay.webhook_base_url.or(self.webhook_base_url),
            port: overlay.port.or(self.port),
            bind: overlay.bind.or(self.bind),
            webhook_secret: overlay.webhook_secret.or(self.webhook_secret),
            subject_prefix: overlay.subject_prefix.or(self.subject_prefix),
            api_base_url: overlay.api_base_url.or(self.api_base_url),
            poll_timeout_secs: overlay.poll_timeout_secs.or(self.poll_timeout_secs),
            poll_retry_secs: overlay.poll_retry_secs.or(self.poll_retry_secs),
            shutdown_timeout_secs: overlay
                .shutdown_timeout_secs
                .or(self.shutdown_timeout_secs),
        }
    }
}

/// Load merged runtime settings (user overrides system).
pub fn load_runtime_settings() -> RuntimeSettings {
    let (system_path, user_path) = runtime_settings_paths();
    load_runtime_settings_from_paths(&system_path, &user_path)
}

#[doc(hidden)]
pub fn runtime_settings_paths() -> (PathBuf, PathBuf) {
    let root = env_path("PRJ_ROOT")
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."));
    let config_home = CONFIG_HOME_OVERRIDE
        .get()
        .cloned()
        .or_else(|| env_path("PRJ_CONFIG_HOME"))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_HOME_RELATIVE_PATH));
    (
        root.join(DEFAULT_SYSTEM_SETTINGS_RELATIVE_PATH),
        root.join(config_home).join(DEFAULT_USER_SETTINGS_RELATIVE_PATH),
    )
}

#[doc(hidden)]
pub fn load_runtime_settings_from_paths(system: &Path, user: &Path) -> RuntimeSettings {
    let system = read_settings_file(system).unwrap_or_default();
    match read_settings_file(user) {
        Some(user) => system.merge(user),
        None => system,
    }
}

/// Missing files are silent; unreadable or invalid ones are skipped with a warning.
fn read_settings_file(path: &Path) -> Option<RuntimeSettings> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(error) if error.kind() == ErrorKind::NotFound => return None,
        Err(error) => {
            tracing::warn!(
                path = %path.display(),
                error = %error,
                "failed to read settings file; ignoring"
            );
            return None;
        }
    };
    serde_yaml::from_str(&raw)
        .map_err(|error| {
            tracing::warn!(
                path = %path.display(),
                error = %error,
                "failed to parse settings yaml; ignoring file"
            );
        })
        .ok()
}

/// Set config-home override (used by CLI `--conf`).
///
/// Relative paths resolve against `PRJ_ROOT` (or the working directory).
/// Only the first call takes effect.
pub fn set_config_home_override(path: impl Into<PathBuf>) {
    let path = path.into();
    if path.as_os_str().is_empty() {
        return;
    }
    if let Err(ignored) = CONFIG_HOME_OVERRIDE.set(path) {
        tracing::warn!(
            ignored = %ignored.display(),
            "config home override already set; ignoring subsequent value"
        );
    }
}

fn env_path(name: &str) -> Option<PathBuf> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}
