//! Error taxonomy for the gateway.
//!
//! Library paths return these typed errors; orchestration and the binary wrap
//! them with `anyhow` context.

use thiserror::Error;

/// Failure classes shared by ingestion, dispatch and startup.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Missing or inconsistent configuration; fatal at startup.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Platform or bus unreachable.
    #[error("transport error: {0}")]
    Transport(String),

    /// Malformed update, outgoing envelope or subject.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Webhook secret mismatch.
    #[error("unauthorized: {0}")]
    Auth(String),
}

impl From<crate::channels::telegram::ApiCallFailed> for GatewayError {
    fn from(error: crate::channels::telegram::ApiCallFailed) -> Self {
        Self::Transport(error.to_string())
    }
}

impl From<crate::bus::BusError> for GatewayError {
    fn from(error: crate::bus::BusError) -> Self {
        Self::Transport(error.to_string())
    }
}
