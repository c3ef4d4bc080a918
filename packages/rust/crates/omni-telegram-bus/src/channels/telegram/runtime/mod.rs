//! Ingestion strategies: long-poll pull and webhook push.

pub mod polling;
pub mod webhook;
