//! Top-level orchestration: per-bot wiring, HTTP surface, shutdown.

mod run;
mod server;
mod signal;

pub use run::Gateway;
pub use server::{HttpServer, start_http_server};
pub use signal::shutdown_signal;
