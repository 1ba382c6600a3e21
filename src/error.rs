//! Upstream error type.
//!
//! Rate-limit detection happens exactly once, where the HTTP response is
//! decoded. Everything above that layer (retry, orchestrator, API) only looks
//! at [`ErrorKind`].

use serde::Serialize;
use thiserror::Error;

/// Coarse classification carried through the call chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    RateLimited,
    Other,
}

impl ErrorKind {
    /// Metric label value.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::RateLimited => "rate_limited",
            ErrorKind::Other => "other",
        }
    }
}

#[derive(Debug, Error)]
pub enum UplinkError {
    #[error("upstream quota exhausted: {0}")]
    RateLimited(String),

    #[error("upstream returned HTTP {status}: {message}")]
    Upstream { status: u16, message: String },

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("malformed upstream payload: {0}")]
    Payload(String),

    #[error("upstream API credential is not configured")]
    MissingCredential,
}

impl UplinkError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            UplinkError::RateLimited(_) => ErrorKind::RateLimited,
            _ => ErrorKind::Other,
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        self.kind() == ErrorKind::RateLimited
    }

    /// Build the error for a non-success HTTP answer, classifying quota refusals.
    pub fn from_status(status: u16, body: &str) -> Self {
        let message = body.trim().chars().take(512).collect::<String>();
        if looks_rate_limited(Some(status), body) {
            UplinkError::RateLimited(message)
        } else {
            UplinkError::Upstream { status, message }
        }
    }
}

/// Quota markers: HTTP 429, or QUOTA / RESOURCE_EXHAUSTED / 429 anywhere in the body.
pub fn looks_rate_limited(status: Option<u16>, body: &str) -> bool {
    if status == Some(429) {
        return true;
    }
    let upper = body.to_ascii_uppercase();
    ["QUOTA", "RESOURCE_EXHAUSTED", "429"]
        .iter()
        .any(|marker| upper.contains(marker))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_429_is_rate_limited() {
        let e = UplinkError::from_status(429, "slow down");
        assert_eq!(e.kind(), ErrorKind::RateLimited);
    }

    #[test]
    fn quota_markers_in_body_are_rate_limited() {
        let body = r#"{"error":{"code":400,"message":"Quota exceeded","status":"RESOURCE_EXHAUSTED"}}"#;
        assert!(UplinkError::from_status(400, body).is_rate_limited());
        assert!(looks_rate_limited(None, "you exceeded your current quota"));
    }

    #[test]
    fn other_failures_stay_generic() {
        let e = UplinkError::from_status(503, "backend unavailable");
        assert_eq!(e.kind(), ErrorKind::Other);
        assert!(matches!(e, UplinkError::Upstream { status: 503, .. }));
        assert_eq!(UplinkError::MissingCredential.kind(), ErrorKind::Other);
    }
}
