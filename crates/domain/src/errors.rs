//! Error types used throughout the workspace

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::CallResult;

/// Main error type for Polycall
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum PolycallError {
    /// Malformed endpoint or gRPC method name. Never retried.
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    /// TLS material, channel setup or reflection lookup failed.
    #[error("Client initialization error: {0}")]
    ClientInit(String),

    /// Deadline exceeded on the underlying transport call.
    #[error("Timeout: {0}")]
    Timeout(String),

    /// HTTP status >= 400, SOAP fault or gRPC status error.
    #[error("{0}")]
    Protocol(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Encode error: {0}")]
    Encode(String),

    #[error("Decode error: {0}")]
    Decode(String),
}

impl PolycallError {
    /// Only deadline failures are eligible for another attempt.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }

    /// Short machine-readable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Config(_) => "config",
            Self::ClientInit(_) => "client_init",
            Self::Timeout(_) => "timeout",
            Self::Protocol(_) => "protocol",
            Self::Transport(_) => "transport",
            Self::Encode(_) => "encode",
            Self::Decode(_) => "decode",
        }
    }
}

/// Failure of a call through the orchestrator.
///
/// Carries the error together with the normalized result when the call got as
/// far as a protocol client. The result's `error` field holds the same
/// message, so callers may inspect either channel.
#[derive(Error, Debug, Clone)]
#[error("{error}")]
pub struct CallError {
    pub error: PolycallError,
    pub result: Option<CallResult>,
}

impl CallError {
    /// Error raised before any attempt was made (validation, client setup).
    pub fn before_call(error: PolycallError) -> Self {
        Self { error, result: None }
    }

    /// Error raised by an attempt, with the normalized result attached.
    pub fn with_result(error: PolycallError, result: CallResult) -> Self {
        Self { error, result: Some(result) }
    }

    pub fn is_timeout(&self) -> bool {
        self.error.is_timeout()
    }

    /// Status code of the attached result, if any.
    pub fn status_code(&self) -> Option<u16> {
        self.result.as_ref().map(|r| r.status_code)
    }
}

impl From<PolycallError> for CallError {
    fn from(error: PolycallError) -> Self {
        Self::before_call(error)
    }
}

/// Result type alias for Polycall operations
pub type Result<T> = std::result::Result<T, PolycallError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_timeouts_are_retryable() {
        assert!(PolycallError::Timeout("deadline".into()).is_timeout());
        assert!(!PolycallError::Protocol("HTTP 500: boom".into()).is_timeout());
        assert!(!PolycallError::Transport("refused".into()).is_timeout());
        assert!(!PolycallError::Validation("bad".into()).is_timeout());
    }

    #[test]
    fn protocol_errors_display_verbatim() {
        let err = PolycallError::Protocol("SOAP fault: [soap:Server] boom - detail".into());
        assert_eq!(err.to_string(), "SOAP fault: [soap:Server] boom - detail");
    }

    #[test]
    fn serializes_with_type_tag() {
        let err = PolycallError::ClientInit("bad ca".into());
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["type"], "ClientInit");
        assert_eq!(json["message"], "bad ca");
    }

    #[test]
    fn call_error_displays_inner_error() {
        let err = CallError::before_call(PolycallError::Validation("name required".into()));
        assert_eq!(err.to_string(), "Validation error: name required");
        assert!(err.result.is_none());
        assert_eq!(err.status_code(), None);
    }
}
