use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use futures::channel::mpsc;

use crate::bus::{BusError, BusMessage, BusSubscription, MessageBus, ReplyAddress};

/// One recorded publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedMessage {
    pub subject: String,
    pub payload: Bytes,
}

/// In-memory [`MessageBus`] that records publishes and lets tests inject
/// messages into live subscriptions.
#[derive(Default)]
pub struct RecordingBus {
    published: Mutex<Vec<PublishedMessage>>,
    subscribers: Mutex<Vec<(String, mpsc::UnboundedSender<BusMessage>)>>,
    fail_publish: AtomicBool,
    fail_subscribe: AtomicBool,
    flushes: AtomicUsize,
}

impl RecordingBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_publish(&self, fail: bool) {
        self.fail_publish.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_subscribe(&self, fail: bool) {
        self.fail_subscribe.store(fail, Ordering::SeqCst);
    }

    pub fn published(&self) -> Vec<PublishedMessage> {
        lock(&self.published).clone()
    }

    pub fn published_on(&self, subject: &str) -> Vec<Bytes> {
        lock(&self.published)
            .iter()
            .filter(|message| message.subject == subject)
            .map(|message| message.payload.clone())
            .collect()
    }

    pub fn subscriptions(&self) -> Vec<String> {
        lock(&self.subscribers)
            .iter()
            .map(|(pattern, _)| pattern.clone())
            .collect()
    }

    pub fn flush_count(&self) -> usize {
        self.flushes.load(Ordering::SeqCst)
    }

    /// Deliver a message to every live subscription whose pattern matches.
    /// Returns how many subscriptions received it.
    pub fn inject(&self, subject: &str, payload: impl Into<Bytes>, reply: Option<&str>) -> usize {
        let message = BusMessage {
            subject: subject.to_string(),
            payload: payload.into(),
            reply: reply.map(ReplyAddress::new),
        };
        let mut subscribers = lock(&self.subscribers);
        subscribers.retain(|(_, sender)| !sender.is_closed());
        subscribers
            .iter()
            .filter(|(pattern, _)| subject_matches(pattern, subject))
            .filter(|(_, sender)| sender.unbounded_send(message.clone()).is_ok())
            .count()
    }
}

#[async_trait]
impl MessageBus for RecordingBus {
    async fn publish(&self, subject: String, payload: Bytes) -> Result<(), BusError> {
        if self.fail_publish.load(Ordering::SeqCst) {
            return Err(BusError::Publish {
                subject,
                reason: "simulated bus outage".to_string(),
            });
        }
        lock(&self.published).push(PublishedMessage { subject, payload });
        Ok(())
    }

    async fn subscribe(&self, pattern: String) -> Result<BusSubscription, BusError> {
        if self.fail_subscribe.load(Ordering::SeqCst) {
            return Err(BusError::Subscribe {
                pattern,
                reason: "simulated bus outage".to_string(),
            });
        }
        let (sender, receiver) = mpsc::unbounded();
        lock(&self.subscribers).push((pattern, sender));
        Ok(receiver.boxed())
    }

    async fn flush(&self) -> Result<(), BusError> {
        self.flushes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// NATS-style matching: `*` matches one segment, trailing `>` one or more.
pub fn subject_matches(pattern: &str, subject: &str) -> bool {
    let mut subject_tokens = subject.split('.');
    for token in pattern.split('.') {
        match (token, subject_tokens.next()) {
            (">", Some(_)) => return true,
            ("*", Some(_)) => {}
            (literal, Some(actual)) if literal == actual => {}
            _ => return false,
        }
    }
    subject_tokens.next().is_none()
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
