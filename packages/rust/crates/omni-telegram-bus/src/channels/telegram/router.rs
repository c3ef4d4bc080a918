//! Fans a decoded update out to the per-bot inbound subjects.

use std::sync::Arc;

use bytes::Bytes;

use super::update::Update;
use crate::bus::{MessageBus, subjects};

/// Publishes decoded updates under `<prefix>.<bot>.in.*`.
#[derive(Clone)]
pub struct UpdateRouter {
    bus: Arc<dyn MessageBus>,
    subject_prefix: String,
}

impl UpdateRouter {
    pub fn new(bus: Arc<dyn MessageBus>, subject_prefix: impl Into<String>) -> Self {
        Self {
            bus,
            subject_prefix: subject_prefix.into(),
        }
    }

    /// Publish the full update, then the type-scoped inner payload if the
    /// update has a recognized kind.
    ///
    /// Publish failures are logged and never stop the remaining publish.
    /// Returns how many publishes succeeded.
    pub async fn route(&self, bot: &str, update: &Update) -> usize {
        let mut published = 0;
        let full = Bytes::copy_from_slice(update.raw().get().as_bytes());
        if self
            .publish(bot, subjects::IN_UPDATE, full, update.update_id())
            .await
        {
            published += 1;
        }

        let kind = update.kind();
        if let (Some(leaf), Some(inner)) = (kind.subject_leaf(), update.payload().inner()) {
            let inner = Bytes::copy_from_slice(inner.get().as_bytes());
            if self.publish(bot, leaf, inner, update.update_id()).await {
                published += 1;
            }
        }

        tracing::debug!(
            bot,
            update_id = update.update_id(),
            kind = ?kind,
            published,
            "routed telegram update"
        );
        published
    }

    async fn publish(&self, bot: &str, leaf: &str, payload: Bytes, update_id: i64) -> bool {
        let subject = subjects::inbound(&self.subject_prefix, bot, leaf);
        match self.bus.publish(subject.clone(), payload).await {
            Ok(()) => true,
            Err(error) => {
                tracing::warn!(
                    bot,
                    update_id,
                    subject = %subject,
                    error = %error,
                    "failed to publish update"
                );
                false
            }
        }
    }
}
