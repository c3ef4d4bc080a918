//! Bot identity discovery from `BOT_<NAME>=<token>` environment variables.

use std::collections::BTreeMap;
use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};

use crate::error::GatewayError;

/// Environment key prefix marking a bot credential.
pub const BOT_ENV_PREFIX: &str = "BOT_";

/// One configured bot: lowercase name plus its Bot API token.
///
/// The token is held as a [`SecretString`], so `Debug` output never shows it.
#[derive(Debug)]
pub struct BotIdentity {
    name: String,
    token: SecretString,
}

impl BotIdentity {
    /// Build an identity; `name` must already be normalized.
    pub fn new(name: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            token: SecretString::from(token.into()),
        }
    }

    /// Subject-safe bot name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn token(&self) -> &str {
        self.token.expose_secret()
    }
}

/// Immutable set of bots discovered at startup.
#[derive(Debug, Clone)]
pub struct BotRegistry {
    bots: Arc<BTreeMap<String, Arc<BotIdentity>>>,
}

impl BotRegistry {
    /// Scan the process environment.
    pub fn discover() -> Result<Self, GatewayError> {
        Self::discover_from(std::env::vars())
    }

    /// Build the registry from `(key, value)` pairs.
    ///
    /// Fails when no bot is found, when a derived name is not subject-safe, or
    /// when two keys derive the same name.
    pub fn discover_from<I, K, V>(vars: I) -> Result<Self, GatewayError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut bots: BTreeMap<String, (String, Arc<BotIdentity>)> = BTreeMap::new();
        for (key, value) in vars {
            let key = key.as_ref();
            let value = value.as_ref();
            let Some(raw_name) = key.strip_prefix(BOT_ENV_PREFIX) else {
                continue;
            };
            if value.is_empty() {
                continue;
            }
            let name = normalize_bot_name(raw_name);
            validate_bot_name(&name, key)?;
            if let Some((existing_key, _)) = bots.get(&name) {
                return Err(GatewayError::Configuration(format!(
                    "bot name `{name}` is derived from both {existing_key} and {key}"
                )));
            }
            let identity = Arc::new(BotIdentity::new(name.clone(), value));
            bots.insert(name, (key.to_string(), identity));
        }

        if bots.is_empty() {
            return Err(GatewayError::Configuration(
                "no bots configured; set BOT_<NAME>=<token> environment variables".to_string(),
            ));
        }

        let bots = bots
            .into_iter()
            .map(|(name, (_, identity))| (name, identity))
            .collect();
        Ok(Self {
            bots: Arc::new(bots),
        })
    }

    /// Look up a bot by its normalized name.
    pub fn get(&self, name: &str) -> Option<&Arc<BotIdentity>> {
        self.bots.get(name)
    }

    /// Bots in name order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<BotIdentity>> {
        self.bots.values()
    }

    /// Sorted bot names.
    pub fn names(&self) -> Vec<&str> {
        self.bots.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.bots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bots.is_empty()
    }
}

/// Lower-case the part of the key after `BOT_`.
pub fn normalize_bot_name(raw: &str) -> String {
    raw.trim().to_lowercase()
}

fn validate_bot_name(name: &str, key: &str) -> Result<(), GatewayError> {
    if name.is_empty() {
        return Err(GatewayError::Configuration(format!(
            "{key} does not name a bot; expected BOT_<NAME>"
        )));
    }
    let valid = name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-');
    if !valid {
        return Err(GatewayError::Configuration(format!(
            "{key} derives bot name `{name}`; only [a-z0-9_-] is allowed in subjects"
        )));
    }
    Ok(())
}
