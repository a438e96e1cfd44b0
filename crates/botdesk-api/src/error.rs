use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::auth::LoginReason;

/// A single field-level validation failure reported by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    #[serde(default)]
    pub field: String,
    pub message: String,
}

/// Top-level error type for the `botdesk-api` crate.
///
/// Errors are classified by HTTP status and payload shape: field-level
/// validation arrays, single-message API errors, and transport failures.
/// `botdesk-core` normalizes these into `{message, code}` notices.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Credentials rejected (bad login, or 401 on an endpoint that never refreshes).
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// The session could not be refreshed; the caller must log in again.
    #[error("Session expired ({reason}) -- login required")]
    SessionExpired { reason: LoginReason },

    // ── API payload errors ──────────────────────────────────────────
    /// `{"errors": [{"field", "message"}]}` payloads.
    #[error("Validation failed: {}", summarize(.errors))]
    Validation { status: u16, errors: Vec<FieldError> },

    /// `{"message", "code"}` payloads, or a bare body with a non-2xx status.
    #[error("API error (HTTP {status}): {message}")]
    Api {
        status: u16,
        message: String,
        code: Option<String>,
    },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Request timed out.
    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// TLS setup or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Data ────────────────────────────────────────────────────────
    /// Request body could not be encoded as JSON.
    #[error("Failed to encode request body: {0}")]
    Encoding(#[from] serde_json::Error),

    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

fn summarize(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| {
            if e.field.is_empty() {
                e.message.clone()
            } else {
                format!("{}: {}", e.field, e.message)
            }
        })
        .collect::<Vec<_>>()
        .join("; ")
}

impl Error {
    /// HTTP status associated with this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Validation { status, .. } | Self::Api { status, .. } => Some(*status),
            Self::Authentication { .. } | Self::SessionExpired { .. } => Some(401),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Returns `true` for network-class failures worth retrying on reads.
    ///
    /// Client (4xx) errors are never transient.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Self::Timeout { .. } => true,
            Self::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Returns `true` if the server rejected the request as a client error.
    pub fn is_client_error(&self) -> bool {
        self.status().is_some_and(|s| (400..500).contains(&s))
    }

    /// Returns `true` if the caller has to go through login again.
    pub fn requires_login(&self) -> bool {
        matches!(self, Self::SessionExpired { .. })
    }

    /// Returns `true` if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// Extract the API error code, if available.
    pub fn api_error_code(&self) -> Option<&str> {
        match self {
            Self::Api { code, .. } => code.as_deref(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_message_lists_fields() {
        let err = Error::Validation {
            status: 422,
            errors: vec![
                FieldError {
                    field: "name".into(),
                    message: "must not be empty".into(),
                },
                FieldError {
                    field: String::new(),
                    message: "payload rejected".into(),
                },
            ],
        };
        assert_eq!(
            err.to_string(),
            "Validation failed: name: must not be empty; payload rejected"
        );
        assert!(err.is_client_error());
        assert!(!err.is_transient());
    }

    #[test]
    fn server_errors_are_transient_client_errors_are_not() {
        let server = Error::Api {
            status: 503,
            message: "unavailable".into(),
            code: None,
        };
        let client = Error::Api {
            status: 404,
            message: "missing".into(),
            code: Some("not_found".into()),
        };
        assert!(server.is_transient());
        assert!(!client.is_transient());
        assert!(client.is_not_found());
        assert_eq!(client.api_error_code(), Some("not_found"));
    }

    #[test]
    fn session_expired_requires_login() {
        let err = Error::SessionExpired {
            reason: LoginReason::SessionExpired,
        };
        assert!(err.requires_login());
        assert_eq!(err.status(), Some(401));
    }
}
