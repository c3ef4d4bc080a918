//! Telegram Bot API bridge: client, update model, router, dispatcher and ingestion.

mod client;
mod constants;
mod dispatch;
mod error;
mod router;
pub mod runtime;
mod update;

pub use client::{TelegramApi, TelegramApiClient};
pub use constants::ALLOWED_UPDATES;
pub use dispatch::{CommandError, OutgoingCommand, OutgoingDispatcher};
pub use error::ApiCallFailed;
pub use router::UpdateRouter;
pub use runtime::polling::{PollIngestor, PollPolicy};
pub use runtime::webhook::{
    WebhookRegistration, WebhookState, build_health_app, build_webhook_app, deregister_all,
    register_until_done,
};
pub use update::{Update, UpdateKind, UpdatePayload};
