//! Decoding of outgoing bus messages into platform API calls.

use bytes::Bytes;
use serde::Deserialize;
use serde_json::value::RawValue;
use thiserror::Error;

use crate::bus::{ReplyAddress, subjects};
use crate::error::GatewayError;

const EMPTY_PARAMS: &[u8] = b"{}";

/// Local rejection of an outgoing message; never reaches the platform.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("invalid subject format")]
    InvalidSubject,

    #[error("bad raw request: {0}")]
    BadRawRequest(String),
}

impl From<CommandError> for GatewayError {
    fn from(error: CommandError) -> Self {
        Self::Protocol(error.to_string())
    }
}

/// A validated platform call. `method` is never empty.
#[derive(Debug, Clone)]
pub struct OutgoingCommand {
    pub method: String,
    pub payload: Bytes,
    /// Presence, not the method, decides whether a response is sent.
    pub reply: Option<ReplyAddress>,
}

#[derive(Deserialize)]
struct RawEnvelope<'a> {
    method: String,
    #[serde(borrow, default)]
    params: Option<&'a RawValue>,
}

impl OutgoingCommand {
    /// Decode `<prefix>.<bot>.out.<method>` with its body.
    ///
    /// For the reserved `raw` method the body is `{method, params}`; otherwise
    /// the body is forwarded verbatim.
    pub fn parse(
        subject: &str,
        body: Bytes,
        reply: Option<ReplyAddress>,
    ) -> Result<Self, CommandError> {
        let method = subjects::method_segment(subject).ok_or(CommandError::InvalidSubject)?;
        if !is_valid_method(method) {
            return Err(CommandError::InvalidSubject);
        }

        if method != subjects::OUT_RAW {
            return Ok(Self {
                method: method.to_string(),
                payload: body,
                reply,
            });
        }

        let envelope: RawEnvelope<'_> = serde_json::from_slice(&body)
            .map_err(|error| CommandError::BadRawRequest(error.to_string()))?;
        let method = envelope.method.trim();
        if !is_valid_method(method) {
            return Err(CommandError::BadRawRequest(format!(
                "invalid method `{method}`"
            )));
        }
        let payload = match envelope.params {
            Some(params) => Bytes::copy_from_slice(params.get().as_bytes()),
            None => Bytes::from_static(EMPTY_PARAMS),
        };
        Ok(Self {
            method: method.to_string(),
            payload,
            reply,
        })
    }
}

fn is_valid_method(method: &str) -> bool {
    !method.is_empty() && !method.contains('/') && !method.chars().any(char::is_whitespace)
}
