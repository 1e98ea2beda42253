//! Tagged result type for fleet handlers: handlers never throw, they return
//! `FleetResult<T>` and report per-unit failures as reductions in batch
//! output rather than propagating an exception.

use crate::error::Error;
use serde::Serialize;

/// A fleet-handler error: a stable `code`, a human message, whether the
/// caller can retry/react (`recoverable`), and an optional remediation hint.
#[derive(Debug, Clone, Serialize)]
pub struct FleetError {
    pub code: &'static str,
    pub message: String,
    pub recoverable: bool,
    pub suggestion: Option<String>,
}

impl FleetError {
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            recoverable: false,
            suggestion: None,
        }
    }

    pub fn recoverable(mut self) -> Self {
        self.recoverable = true;
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

impl std::fmt::Display for FleetError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for FleetError {}

pub type FleetResult<T> = std::result::Result<T, FleetError>;

/// Map an SDK-level [`Error`] onto the closest fleet error code, so handlers
/// can use `?` internally while still returning the tagged result at the
/// handler boundary.
impl From<Error> for FleetError {
    fn from(err: Error) -> Self {
        match &err {
            Error::MissingCredentials => FleetError::new("MISSING_CREDENTIALS", err.to_string()),
            Error::Network { .. } => FleetError::new("NETWORK_ERROR", err.to_string()).recoverable(),
            Error::Authentication { .. } => FleetError::new("AUTHENTICATION_FAILED", err.to_string()),
            Error::RateLimitExhausted { .. } => {
                FleetError::new("RATE_LIMIT_EXHAUSTED", err.to_string()).recoverable()
            }
            Error::Api { .. } => FleetError::new("GITHUB_API_ERROR", err.to_string()).recoverable(),
            Error::Timeout => FleetError::new("TIMEOUT", err.to_string()).recoverable(),
            Error::InvalidState { .. } => FleetError::new("INVALID_STATE", err.to_string()),
            Error::SessionEndedBeforeReply => FleetError::new("SESSION_ENDED_BEFORE_REPLY", err.to_string()),
            Error::AutomatedSessionFailed { .. } => {
                FleetError::new("AUTOMATED_SESSION_FAILED", err.to_string())
            }
            Error::SourceNotFound(_) => FleetError::new("SOURCE_NOT_FOUND", err.to_string()),
            Error::GoalNotFound(_) => FleetError::new("GOAL_NOT_FOUND", err.to_string()),
            Error::Json(_) | Error::Io(_) | Error::Other(_) => FleetError::new("UNKNOWN", err.to_string()),
        }
    }
}
