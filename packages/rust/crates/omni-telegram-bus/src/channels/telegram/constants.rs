pub(crate) const TELEGRAM_DEFAULT_API_BASE: &str = "https://api.telegram.org";
pub(crate) const TELEGRAM_HTTP_CONNECT_TIMEOUT_SECS: u64 = 10;
pub(crate) const TELEGRAM_HTTP_REQUEST_TIMEOUT_SECS: u64 = 30;
/// Added to the server-side long-poll wait for the client-side request timeout.
pub(crate) const TELEGRAM_POLL_REQUEST_GRACE_SECS: u64 = 10;
pub(crate) const TELEGRAM_POLL_CONFLICT_RETRY_SECS: u64 = 2;
pub(crate) const TELEGRAM_POLL_DEFAULT_RATE_LIMIT_RETRY_SECS: u64 = 1;
pub(crate) const TELEGRAM_POLL_MAX_RATE_LIMIT_RETRY_SECS: u64 = 60;

pub(crate) const TELEGRAM_WEBHOOK_SECRET_HEADER: &str = "x-telegram-bot-api-secret-token";
pub(crate) const TELEGRAM_WEBHOOK_REQUEST_TIMEOUT_SECS: u64 = 10;

pub(crate) const METHOD_GET_UPDATES: &str = "getUpdates";
pub(crate) const METHOD_SET_WEBHOOK: &str = "setWebhook";
pub(crate) const METHOD_DELETE_WEBHOOK: &str = "deleteWebhook";

/// Update categories requested from the platform, in routing precedence order.
pub const ALLOWED_UPDATES: [&str; 4] = [
    "message",
    "edited_message",
    "callback_query",
    "inline_query",
];
