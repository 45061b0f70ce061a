//! Error types for the Seedbed provisioning engine.
//!
//! This module provides the error hierarchy for every stage of a run:
//! document loading and validation, the resource service API, and the
//! fatal conditions that abort a provisioning or teardown walk.

use thiserror::Error;

/// The main error type for Seedbed.
#[derive(Debug, Error)]
pub enum SeedbedError {
    /// Document and settings errors.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Resource service API errors.
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// IO errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Document and settings errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No document exists under the requested name.
    #[error("Document not found: {name}")]
    NotFound {
        /// Name that was looked up.
        name: String,
    },

    /// The document could not be parsed or failed validation.
    ///
    /// Every problem found is carried, never just the first one.
    #[error("Document '{document}' is invalid ({} problem(s)): {}", .errors.len(), .errors.join("; "))]
    Invalid {
        /// Name or path of the offending document.
        document: String,
        /// Every problem found.
        errors: Vec<String>,
    },

    /// A required setting was not supplied.
    #[error("Missing setting: {name}")]
    MissingSetting {
        /// Name of the setting (environment variable or flag).
        name: String,
    },
}

/// Resource service API errors.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Authentication failed.
    #[error("Authentication failed: {message}")]
    AuthenticationFailed {
        /// Description of the auth failure.
        message: String,
    },

    /// The service answered with a non-success status.
    #[error("Request failed: {status} - {message}")]
    Request {
        /// HTTP status code.
        status: u16,
        /// Error message extracted from the response body.
        message: String,
        /// Parsed response body, when it was JSON.
        body: Option<serde_json::Value>,
    },

    /// Rate limited.
    #[error("Rate limited, retry after {retry_after_secs} seconds")]
    RateLimited {
        /// Seconds to wait before retrying.
        retry_after_secs: u64,
    },

    /// Network error.
    #[error("Network error communicating with the service: {message}")]
    NetworkError {
        /// Description of the network error.
        message: String,
    },

    /// The response could not be interpreted.
    #[error("Invalid response from the service: {message}")]
    InvalidResponse {
        /// Description of the response issue.
        message: String,
    },
}

/// Result type alias for Seedbed operations.
pub type Result<T> = std::result::Result<T, SeedbedError>;

impl SeedbedError {
    /// Creates a new internal error with the given message.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Returns true if this error is retryable.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Api(ApiError::RateLimited { .. } | ApiError::NetworkError { .. })
        )
    }

    /// Returns the delay the service asked for before retrying, if any.
    #[must_use]
    pub const fn retry_delay_secs(&self) -> Option<u64> {
        match self {
            Self::Api(ApiError::RateLimited { retry_after_secs }) => Some(*retry_after_secs),
            _ => None,
        }
    }

    /// Returns true if this error must abort a whole run rather than
    /// fail a single resource.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Api(ApiError::AuthenticationFailed { .. }) | Self::Internal(_)
        )
    }

    /// Returns the API error behind this error, if any.
    #[must_use]
    pub const fn as_api(&self) -> Option<&ApiError> {
        match self {
            Self::Api(e) => Some(e),
            _ => None,
        }
    }
}

impl ConfigError {
    /// Creates an aggregated validation error.
    #[must_use]
    pub fn invalid(document: impl Into<String>, errors: Vec<String>) -> Self {
        Self::Invalid {
            document: document.into(),
            errors,
        }
    }

    /// Creates a not-found error.
    #[must_use]
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound { name: name.into() }
    }
}

impl ApiError {
    /// Creates an API request error from a status and a raw response body.
    ///
    /// When the body is JSON, its `error.message`, `message` or string
    /// `error` field becomes the message; otherwise the raw text is used.
    #[must_use]
    pub fn from_response(status: u16, text: &str) -> Self {
        let body = serde_json::from_str::<serde_json::Value>(text).ok();
        let message = body
            .as_ref()
            .and_then(extract_message)
            .unwrap_or_else(|| {
                if text.trim().is_empty() {
                    format!("HTTP {status}")
                } else {
                    text.trim().to_string()
                }
            });

        Self::Request {
            status,
            message,
            body,
        }
    }

    /// Creates a network error.
    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self::NetworkError {
            message: message.into(),
        }
    }

    /// Creates an invalid-response error.
    #[must_use]
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            message: message.into(),
        }
    }

    /// Returns the HTTP status, when the service answered.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Request { status, .. } => Some(*status),
            Self::AuthenticationFailed { .. } => Some(401),
            Self::RateLimited { .. } => Some(429),
            Self::NetworkError { .. } | Self::InvalidResponse { .. } => None,
        }
    }

    /// Returns true if the service reported a conflict (409).
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self.status(), Some(409))
    }

    /// Returns true if the service reported a missing resource (404).
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self.status(), Some(404))
    }

    /// Returns the parsed error body, if any.
    #[must_use]
    pub const fn body(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Request { body, .. } => body.as_ref(),
            _ => None,
        }
    }
}

/// Pulls a human-readable message out of a service error body.
#[must_use]
pub fn extract_message(body: &serde_json::Value) -> Option<String> {
    let error = body.get("error");

    error
        .and_then(|e| e.get("message"))
        .or_else(|| body.get("message"))
        .or_else(|| error.filter(|e| e.is_string()))
        .and_then(serde_json::Value::as_str)
        .filter(|m| !m.is_empty())
        .map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_response_prefers_nested_message() {
        let err = ApiError::from_response(
            400,
            r#"{"error":{"name":"Skyline.BadRequest","message":"name is required"}}"#,
        );
        match &err {
            ApiError::Request { status, message, body } => {
                assert_eq!(*status, 400);
                assert_eq!(message, "name is required");
                assert!(body.is_some());
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_from_response_plain_text() {
        let err = ApiError::from_response(502, "bad gateway");
        assert_eq!(err.to_string(), "Request failed: 502 - bad gateway");
        assert!(err.body().is_none());
    }

    #[test]
    fn test_from_response_empty_body() {
        let err = ApiError::from_response(500, "");
        assert_eq!(err.to_string(), "Request failed: 500 - HTTP 500");
    }

    #[test]
    fn test_conflict_and_not_found() {
        assert!(ApiError::from_response(409, "{}").is_conflict());
        assert!(ApiError::from_response(404, "{}").is_not_found());
        assert!(!ApiError::network("reset").is_conflict());
    }

    #[test]
    fn test_invalid_lists_every_problem() {
        let err = ConfigError::invalid(
            "demo",
            vec![String::from("missing name"), String::from("missing title")],
        );
        assert_eq!(
            err.to_string(),
            "Document 'demo' is invalid (2 problem(s)): missing name; missing title"
        );
    }

    #[test]
    fn test_fatal_errors() {
        let auth = SeedbedError::from(ApiError::AuthenticationFailed {
            message: String::from("bad key"),
        });
        assert!(auth.is_fatal());
        assert!(!SeedbedError::from(ApiError::network("reset")).is_fatal());
        assert!(SeedbedError::from(ApiError::network("reset")).is_retryable());
    }

    #[test]
    fn test_retry_delay_comes_from_the_service() {
        let limited = SeedbedError::from(ApiError::RateLimited { retry_after_secs: 7 });
        assert_eq!(limited.retry_delay_secs(), Some(7));
        assert_eq!(SeedbedError::from(ApiError::network("reset")).retry_delay_secs(), None);
    }

    #[test]
    fn test_auth_failure_is_not_a_conflict() {
        let auth = ApiError::AuthenticationFailed {
            message: String::from("bad key"),
        };
        assert_eq!(auth.status(), Some(401));
        assert!(!auth.is_conflict());
        assert!(!auth.is_not_found());
    }
}
