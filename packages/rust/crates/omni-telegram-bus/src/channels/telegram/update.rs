//! Decoded platform update with a single routing discriminant.

use std::collections::HashMap;

use serde::de::{self, Deserialize, Deserializer};
use serde_json::value::RawValue;

use crate::bus::subjects;
use crate::error::GatewayError;

/// Which update category an [`Update`] carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateKind {
    Message,
    EditedMessage,
    CallbackQuery,
    InlineQuery,
    /// None of the recognized fields (channel posts, polls, ...).
    Unknown,
}

impl UpdateKind {
    /// Recognized kinds in routing precedence order.
    pub const PRECEDENCE: [Self; 4] = [
        Self::Message,
        Self::EditedMessage,
        Self::CallbackQuery,
        Self::InlineQuery,
    ];

    /// Field name in the platform's update object.
    pub fn field(self) -> Option<&'static str> {
        match self {
            Self::Message => Some("message"),
            Self::EditedMessage => Some("edited_message"),
            Self::CallbackQuery => Some("callback_query"),
            Self::InlineQuery => Some("inline_query"),
            Self::Unknown => None,
        }
    }

    /// Trailing segment of the type-scoped inbound subject.
    pub fn subject_leaf(self) -> Option<&'static str> {
        match self {
            Self::Message => Some(subjects::IN_MESSAGE),
            Self::EditedMessage => Some(subjects::IN_EDITED),
            Self::CallbackQuery => Some(subjects::IN_CALLBACK),
            Self::InlineQuery => Some(subjects::IN_INLINE),
            Self::Unknown => None,
        }
    }
}

/// Variant-specific inner payload, kept as the exact JSON the platform sent.
#[derive(Debug, Clone)]
pub enum UpdatePayload {
    Message(Box<RawValue>),
    EditedMessage(Box<RawValue>),
    CallbackQuery(Box<RawValue>),
    InlineQuery(Box<RawValue>),
    Unknown,
}

impl UpdatePayload {
    fn new(kind: UpdateKind, inner: Box<RawValue>) -> Self {
        match kind {
            UpdateKind::Message => Self::Message(inner),
            UpdateKind::EditedMessage => Self::EditedMessage(inner),
            UpdateKind::CallbackQuery => Self::CallbackQuery(inner),
            UpdateKind::InlineQuery => Self::InlineQuery(inner),
            UpdateKind::Unknown => Self::Unknown,
        }
    }

    pub fn kind(&self) -> UpdateKind {
        match self {
            Self::Message(_) => UpdateKind::Message,
            Self::EditedMessage(_) => UpdateKind::EditedMessage,
            Self::CallbackQuery(_) => UpdateKind::CallbackQuery,
            Self::InlineQuery(_) => UpdateKind::InlineQuery,
            Self::Unknown => UpdateKind::Unknown,
        }
    }

    pub fn inner(&self) -> Option<&RawValue> {
        match self {
            Self::Message(inner)
            | Self::EditedMessage(inner)
            | Self::CallbackQuery(inner)
            | Self::InlineQuery(inner) => Some(inner),
            Self::Unknown => None,
        }
    }
}

/// One platform update.
///
/// `raw` is the update object exactly as received, including fields the
/// gateway does not model, so the full-update subject never loses data.
#[derive(Debug, Clone)]
pub struct Update {
    update_id: i64,
    payload: UpdatePayload,
    raw: Box<RawValue>,
}

impl Update {
    pub fn from_slice(body: &[u8]) -> Result<Self, GatewayError> {
        let raw: Box<RawValue> = serde_json::from_slice(body)
            .map_err(|error| GatewayError::Protocol(format!("update is not valid JSON: {error}")))?;
        Self::from_raw(raw)
    }

    /// Resolve the discriminant once; the first populated field in
    /// [`UpdateKind::PRECEDENCE`] wins.
    pub fn from_raw(raw: Box<RawValue>) -> Result<Self, GatewayError> {
        let fields: HashMap<String, &RawValue> = serde_json::from_str(raw.get())
            .map_err(|_| GatewayError::Protocol("update is not a JSON object".to_string()))?;

        let update_id = match fields.get("update_id") {
            Some(value) if !is_null(value) => serde_json::from_str::<i64>(value.get())
                .map_err(|error| GatewayError::Protocol(format!("invalid update_id: {error}")))?,
            _ => 0,
        };

        let payload = UpdateKind::PRECEDENCE
            .into_iter()
            .find_map(|kind| {
                let field = kind.field()?;
                fields
                    .get(field)
                    .filter(|value| !is_null(value))
                    .map(|value| UpdatePayload::new(kind, (*value).to_owned()))
            })
            .unwrap_or(UpdatePayload::Unknown);

        Ok(Self {
            update_id,
            payload,
            raw,
        })
    }

    pub fn update_id(&self) -> i64 {
        self.update_id
    }

    pub fn kind(&self) -> UpdateKind {
        self.payload.kind()
    }

    pub fn payload(&self) -> &UpdatePayload {
        &self.payload
    }

    pub fn raw(&self) -> &RawValue {
        &self.raw
    }
}

impl<'de> Deserialize<'de> for Update {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Box::<RawValue>::deserialize(deserializer)?;
        Self::from_raw(raw).map_err(de::Error::custom)
    }
}

fn is_null(value: &RawValue) -> bool {
    value.get().trim() == "null"
}
