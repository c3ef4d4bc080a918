//! Push-mode ingestion: HTTP handler plus per-bot `setWebhook` registration.

mod app;
mod auth;
mod handler;
mod registration;
mod state;

pub use app::{build_health_app, build_webhook_app};
pub use registration::{WebhookRegistration, deregister_all, register_until_done};
pub use state::WebhookState;
