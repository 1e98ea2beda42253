//! Error types for the Jules fleet SDK

use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the SDK's HTTP/activity/session layer.
///
/// Kinds here correspond to the taxonomy in the spec; fleet handlers convert
/// these into [`crate::fleet::FleetError`] at the handler boundary rather than
/// propagating them directly, since handlers never throw.
#[derive(Error, Debug)]
pub enum Error {
    /// The API key was not configured
    #[error("missing credentials: JULES_API_KEY is not set")]
    MissingCredentials,

    /// Network-level failure (connection refused, DNS, TLS, ...)
    #[error("network error calling {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// 401/403 from the Agent API
    #[error("authentication failed calling {url}")]
    Authentication { url: String },

    /// Retries were exhausted against a 429/5xx response
    #[error("rate limit exhausted calling {url} after {attempts} attempts")]
    RateLimitExhausted { url: String, attempts: u32 },

    /// Any other non-retryable, non-auth HTTP failure
    #[error("API error {status} calling {url}: {body}")]
    Api {
        url: String,
        status: u16,
        body: String,
    },

    /// A suspension point exceeded its deadline
    #[error("operation timed out")]
    Timeout,

    /// An operation was attempted against a session in the wrong state
    #[error("invalid state: expected {expected}, found {actual}")]
    InvalidState { expected: String, actual: String },

    /// `ask()`'s activity stream ended before an agent reply arrived
    #[error("session ended before a reply was received")]
    SessionEndedBeforeReply,

    /// A session reached a terminal `failed` state
    #[error("session {session_id} failed: {reason}")]
    AutomatedSessionFailed { session_id: String, reason: String },

    /// `sources/github/{owner}/{repo}` could not be resolved
    #[error("source not found: {0}")]
    SourceNotFound(String),

    /// A goal markdown file could not be read
    #[error("goal not found: {0}")]
    GoalNotFound(String),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Local file I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Catch-all for conditions with no dedicated variant
    #[error("{0}")]
    Other(String),
}

impl Error {
    pub fn other(msg: impl Into<String>) -> Self {
        Error::Other(msg.into())
    }

    pub fn invalid_state(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Error::InvalidState {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// `true` for errors a caller may reasonably retry at a higher level
    /// (distinct from the HTTP client's own internal retry policy, which has
    /// already run its course by the time one of these is constructed).
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::Network { .. } | Error::Timeout | Error::RateLimitExhausted { .. }
        )
    }
}

/// Strip query string and fragment from a URL before it can appear in a
/// user-visible error. Every error constructor that carries a URL MUST route
/// it through this helper first.
pub fn sanitize_url(url: &str) -> String {
    let without_fragment = url.split('#').next().unwrap_or(url);
    without_fragment.split('?').next().unwrap_or(without_fragment).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_strips_query_and_fragment() {
        assert_eq!(
            sanitize_url("https://api.example.com/sessions?pageToken=abc&filter=x#frag"),
            "https://api.example.com/sessions"
        );
    }

    #[test]
    fn sanitize_passthrough_without_query() {
        assert_eq!(
            sanitize_url("https://api.example.com/sessions/1"),
            "https://api.example.com/sessions/1"
        );
    }

    #[test]
    fn error_messages_never_leak_raw_url() {
        let err = Error::Api {
            url: sanitize_url("https://api.example.com/x?secret=1"),
            status: 500,
            body: "boom".into(),
        };
        let msg = err.to_string();
        assert!(!msg.contains('?'));
        assert!(!msg.contains('#'));
    }

    #[test]
    fn is_retryable_classification() {
        assert!(Error::Timeout.is_retryable());
        assert!(!Error::MissingCredentials.is_retryable());
        assert!(!Error::invalid_state("a", "b").is_retryable());
    }
}
