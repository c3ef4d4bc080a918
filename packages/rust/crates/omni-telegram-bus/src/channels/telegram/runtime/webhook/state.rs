use std::sync::Arc;

use secrecy::SecretString;

use super::super::super::router::UpdateRouter;
use crate::config::BotRegistry;

/// Shared state of the webhook handler.
#[derive(Clone)]
pub struct WebhookState {
    pub(super) registry: BotRegistry,
    pub(super) router: UpdateRouter,
    pub(super) secret_token: Option<Arc<SecretString>>,
}

impl WebhookState {
    pub fn new(
        registry: BotRegistry,
        router: UpdateRouter,
        secret_token: Option<Arc<SecretString>>,
    ) -> Self {
        Self {
            registry,
            router,
            secret_token,
        }
    }
}
