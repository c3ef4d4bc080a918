use serde::Deserialize;
use serde_json::value::RawValue;
use thiserror::Error;

/// A platform call that produced no response body.
///
/// `reason` never contains the request URL, which embeds the bot token.
#[derive(Debug, Clone, Error)]
#[error("{method} failed: {reason}")]
pub struct ApiCallFailed {
    pub method: String,
    pub reason: String,
}

impl ApiCallFailed {
    pub fn new(method: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn from_reqwest(method: &str, err: reqwest::Error) -> Self {
        let err = err.without_url();
        let reason = if err.is_timeout() {
            format!("timed out: {err}")
        } else {
            err.to_string()
        };
        Self::new(method, reason)
    }
}

/// Bot API response envelope: `{ok, result?, error_code?, description?, parameters?}`.
#[derive(Debug, Deserialize)]
pub(crate) struct ApiResponse {
    #[serde(default)]
    pub(crate) ok: bool,
    pub(crate) error_code: Option<i64>,
    pub(crate) description: Option<String>,
    pub(crate) parameters: Option<ResponseParameters>,
    pub(crate) result: Option<Box<RawValue>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ResponseParameters {
    pub(crate) retry_after: Option<u64>,
}

impl ApiResponse {
    pub(crate) fn parse(body: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(body)
    }

    pub(crate) fn retry_after_secs(&self) -> Option<u64> {
        self.parameters.as_ref().and_then(|p| p.retry_after)
    }

    pub(crate) fn description_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.description
            .as_deref()
            .filter(|s| !s.is_empty())
            .unwrap_or(fallback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rate_limit_envelope() {
        let response = ApiResponse::parse(
            br#"{"ok":false,"error_code":429,"description":"Too Many Requests","parameters":{"retry_after":7}}"#,
        )
        .unwrap();
        assert!(!response.ok);
        assert_eq!(response.error_code, Some(429));
        assert_eq!(response.retry_after_secs(), Some(7));
        assert_eq!(response.description_or("x"), "Too Many Requests");
    }

    #[test]
    fn missing_ok_flag_is_failure() {
        let response = ApiResponse::parse(br#"{"result":[]}"#).unwrap();
        assert!(!response.ok);
        assert_eq!(response.description_or("fallback"), "fallback");
    }
}
