use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;

use super::traits::{BusError, BusMessage, BusSubscription, MessageBus, ReplyAddress};

/// [`MessageBus`] backed by one shared NATS connection.
#[derive(Clone)]
pub struct NatsBus {
    client: async_nats::Client,
}

impl NatsBus {
    pub async fn connect(url: &str) -> Result<Self, BusError> {
        let client = async_nats::connect(url)
            .await
            .map_err(|error| BusError::Connect {
                url: url.to_string(),
                reason: error.to_string(),
            })?;
        tracing::info!(url, "connected to NATS");
        Ok(Self { client })
    }
}

#[async_trait]
impl MessageBus for NatsBus {
    async fn publish(&self, subject: String, payload: Bytes) -> Result<(), BusError> {
        self.client
            .publish(subject.clone(), payload)
            .await
            .map_err(|error| BusError::Publish {
                subject,
                reason: error.to_string(),
            })
    }

    async fn subscribe(&self, pattern: String) -> Result<BusSubscription, BusError> {
        let subscriber = self
            .client
            .subscribe(pattern.clone())
            .await
            .map_err(|error| BusError::Subscribe {
                pattern,
                reason: error.to_string(),
            })?;
        Ok(subscriber
            .map(|message| BusMessage {
                subject: message.subject.to_string(),
                payload: message.payload,
                reply: message
                    .reply
                    .map(|reply| ReplyAddress::new(reply.to_string())),
            })
            .boxed())
    }

    async fn flush(&self) -> Result<(), BusError> {
        self.client
            .flush()
            .await
            .map_err(|error| BusError::Flush(error.to_string()))
    }
}
