use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use crate::channels::telegram::{ApiCallFailed, TelegramApi};
use crate::config::BotIdentity;

const GET_UPDATES: &str = "getUpdates";
const IDLE_POLL_DELAY: Duration = Duration::from_millis(20);
const EMPTY_BATCH: &[u8] = br#"{"ok":true,"result":[]}"#;
const OK_TRUE: &[u8] = br#"{"ok":true,"result":true}"#;

/// One recorded platform call. `getUpdates` records its offset as the payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub bot: String,
    pub method: String,
    pub payload: Bytes,
}

type Scripted = Result<Bytes, ApiCallFailed>;

/// Scripted [`TelegramApi`]: per-method queues of responses, falling back to
/// `{"ok":true,"result":true}` (or an empty `getUpdates` batch after a short
/// idle delay once the script runs out).
#[derive(Default)]
pub struct RecordingTelegramApi {
    calls: Mutex<Vec<RecordedCall>>,
    scripts: Mutex<HashMap<String, VecDeque<Scripted>>>,
}

impl RecordingTelegramApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_response(&self, method: &str, body: impl Into<Bytes>) {
        self.push(method, Ok(body.into()));
    }

    pub fn push_failure(&self, method: &str, reason: &str) {
        self.push(method, Err(ApiCallFailed::new(method, reason)));
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        lock(&self.calls).clone()
    }

    pub fn calls_to(&self, method: &str) -> Vec<RecordedCall> {
        lock(&self.calls)
            .iter()
            .filter(|call| call.method == method)
            .cloned()
            .collect()
    }

    /// Offsets requested by `getUpdates`, in order.
    pub fn polled_offsets(&self) -> Vec<i64> {
        self.calls_to(GET_UPDATES)
            .iter()
            .filter_map(|call| std::str::from_utf8(&call.payload).ok()?.parse().ok())
            .collect()
    }

    fn push(&self, method: &str, response: Scripted) {
        lock(&self.scripts)
            .entry(method.to_string())
            .or_default()
            .push_back(response);
    }

    fn next_scripted(&self, method: &str) -> Option<Scripted> {
        lock(&self.scripts)
            .get_mut(method)
            .and_then(VecDeque::pop_front)
    }

    fn record(&self, bot: &BotIdentity, method: &str, payload: Bytes) {
        lock(&self.calls).push(RecordedCall {
            bot: bot.name().to_string(),
            method: method.to_string(),
            payload,
        });
    }
}

#[async_trait]
impl TelegramApi for RecordingTelegramApi {
    async fn call(
        &self,
        bot: &BotIdentity,
        method: &str,
        payload: Bytes,
    ) -> Result<Bytes, ApiCallFailed> {
        self.record(bot, method, payload);
        self.next_scripted(method)
            .unwrap_or_else(|| Ok(Bytes::from_static(OK_TRUE)))
    }

    async fn get_updates(
        &self,
        bot: &BotIdentity,
        offset: i64,
        _timeout_secs: u64,
    ) -> Result<Bytes, ApiCallFailed> {
        self.record(bot, GET_UPDATES, Bytes::from(offset.to_string()));
        if let Some(scripted) = self.next_scripted(GET_UPDATES) {
            return scripted;
        }
        tokio::time::sleep(IDLE_POLL_DELAY).await;
        Ok(Bytes::from_static(EMPTY_BATCH))
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
