//! Bus abstraction consumed by the router, dispatcher and gateway.

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use thiserror::Error;

/// Bus-provided destination for a correlated response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyAddress(String);

impl ReplyAddress {
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// One message delivered to a subscription.
#[derive(Debug, Clone)]
pub struct BusMessage {
    pub subject: String,
    pub payload: Bytes,
    /// Present when the publisher used request/reply.
    pub reply: Option<ReplyAddress>,
}

/// Stream of messages matching a subscription pattern; dropping it unsubscribes.
pub type BusSubscription = BoxStream<'static, BusMessage>;

#[derive(Debug, Error)]
pub enum BusError {
    #[error("bus connect to {url} failed: {reason}")]
    Connect { url: String, reason: String },

    #[error("publish to {subject} failed: {reason}")]
    Publish { subject: String, reason: String },

    #[error("subscribe to {pattern} failed: {reason}")]
    Subscribe { pattern: String, reason: String },

    #[error("bus flush failed: {0}")]
    Flush(String),
}

/// Publish/subscribe surface the gateway needs from a bus client.
///
/// Implementations must be safe for concurrent callers; every per-bot
/// component shares one instance.
#[async_trait]
pub trait MessageBus: Send + Sync {
    async fn publish(&self, subject: String, payload: Bytes) -> Result<(), BusError>;

    /// Respond to a request. Default publishes to the reply address as a subject.
    async fn reply(&self, to: &ReplyAddress, payload: Bytes) -> Result<(), BusError> {
        self.publish(to.as_str().to_string(), payload).await
    }

    async fn subscribe(&self, pattern: String) -> Result<BusSubscription, BusError>;

    /// Push buffered publishes to the server.
    async fn flush(&self) -> Result<(), BusError>;
}
