// ── Core error types ──
//
// Consumers of botdesk-core never see raw HTTP statuses or JSON parse
// failures. The `From<botdesk_api::Error>` impl translates wire errors into
// domain variants, and `notice()` flattens any of them into the
// `{message, code}` pair that toasts display.

use botdesk_api::{FieldError, LoginReason};
use serde::Serialize;
use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot reach backend at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    // ── Session errors ───────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    /// The session is gone; the consumer has to route through login.
    #[error("Login required ({reason})")]
    LoginRequired { reason: LoginReason },

    #[error("Not logged in")]
    NotAuthenticated,

    // ── Data errors ──────────────────────────────────────────────────
    #[error("{entity} not found: {identifier}")]
    NotFound { entity: String, identifier: String },

    #[error("Validation failed: {message}")]
    ValidationFailed {
        message: String,
        fields: Vec<FieldError>,
    },

    // ── API errors (wrapped, not exposed raw) ────────────────────────
    #[error("API error: {message}")]
    Api {
        message: String,
        code: Option<String>,
        status: Option<u16>,
    },

    /// A read was superseded by an optimistic write and dropped.
    #[error("Request cancelled")]
    Cancelled,

    // ── Local errors ─────────────────────────────────────────────────
    #[error("Storage error: {message}")]
    Storage { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

/// The normalized shape every error is reduced to before display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorNotice {
    pub message: String,
    pub code: String,
}

impl CoreError {
    /// Validation failure with no per-field detail.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::ValidationFailed {
            message: message.into(),
            fields: Vec::new(),
        }
    }

    /// Network-class failures that a read may retry. 4xx never qualifies.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::ConnectionFailed { .. } | Self::Timeout { .. } => true,
            Self::Api { status, .. } => status.is_none_or(|s| s >= 500),
            _ => false,
        }
    }

    /// `true` when the error belongs on the login path rather than in a toast.
    pub fn requires_login(&self) -> bool {
        matches!(self, Self::LoginRequired { .. } | Self::NotAuthenticated)
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Stable machine-readable code for this error.
    pub fn code(&self) -> String {
        match self {
            Self::ConnectionFailed { .. } => "connection_failed".into(),
            Self::Timeout { .. } => "timeout".into(),
            Self::AuthenticationFailed { .. } => "authentication_failed".into(),
            Self::LoginRequired { reason } => reason.to_string(),
            Self::NotAuthenticated => "not_authenticated".into(),
            Self::NotFound { .. } => "not_found".into(),
            Self::ValidationFailed { .. } => "validation_error".into(),
            Self::Api { code: Some(code), .. } => code.clone(),
            Self::Api {
                status: Some(status),
                ..
            } => format!("http_{status}"),
            Self::Api { .. } => "api_error".into(),
            Self::Cancelled => "cancelled".into(),
            Self::Storage { .. } => "storage_error".into(),
            Self::Config { .. } => "config_error".into(),
            Self::Internal(_) => "internal_error".into(),
        }
    }

    /// Flatten into `{message, code}` for a toast.
    pub fn notice(&self) -> ErrorNotice {
        let message = match self {
            Self::Api { message, .. } | Self::ValidationFailed { message, .. } => message.clone(),
            other => other.to_string(),
        };
        ErrorNotice {
            message,
            code: self.code(),
        }
    }
}

// ── Conversion from wire errors ──────────────────────────────────────

impl From<botdesk_api::Error> for CoreError {
    fn from(err: botdesk_api::Error) -> Self {
        match err {
            botdesk_api::Error::Authentication { message } => {
                CoreError::AuthenticationFailed { message }
            }
            botdesk_api::Error::SessionExpired { reason } => CoreError::LoginRequired { reason },
            botdesk_api::Error::Validation { errors, .. } => {
                let message = errors
                    .iter()
                    .map(|e| e.message.as_str())
                    .collect::<Vec<_>>()
                    .join("; ");
                CoreError::ValidationFailed {
                    message,
                    fields: errors,
                }
            }
            botdesk_api::Error::Api {
                status: 404,
                message,
                ..
            } => CoreError::NotFound {
                entity: "Resource".into(),
                identifier: message,
            },
            botdesk_api::Error::Api {
                status,
                message,
                code,
            } => CoreError::Api {
                message,
                code,
                status: Some(status),
            },
            botdesk_api::Error::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout { timeout_secs: 0 }
                } else if e.is_connect() || e.is_request() {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map_or_else(|| "<unknown>".into(), ToString::to_string),
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Api {
                        message: e.to_string(),
                        code: None,
                        status: e.status().map(|s| s.as_u16()),
                    }
                }
            }
            botdesk_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            botdesk_api::Error::Timeout { timeout_secs } => CoreError::Timeout { timeout_secs },
            botdesk_api::Error::Tls(msg) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("TLS error: {msg}"),
            },
            botdesk_api::Error::Encoding(e) => CoreError::Internal(e.to_string()),
            botdesk_api::Error::Deserialization { message, .. } => CoreError::Api {
                message: format!("Unexpected response: {message}"),
                code: Some("invalid_response".into()),
                status: None,
            },
        }
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::Storage {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn validation_errors_keep_fields() {
        let err = CoreError::from(botdesk_api::Error::Validation {
            status: 422,
            errors: vec![FieldError {
                field: "name".into(),
                message: "Name is required".into(),
            }],
        });
        assert_eq!(
            err.notice(),
            ErrorNotice {
                message: "Name is required".into(),
                code: "validation_error".into(),
            }
        );
        assert!(!err.is_transient());
    }

    #[test]
    fn api_code_wins_over_status() {
        let err = CoreError::from(botdesk_api::Error::Api {
            status: 409,
            message: "Name already taken".into(),
            code: Some("BOT_EXISTS".into()),
        });
        assert_eq!(err.code(), "BOT_EXISTS");

        let bare = CoreError::from(botdesk_api::Error::Api {
            status: 502,
            message: "Bad gateway".into(),
            code: None,
        });
        assert_eq!(bare.code(), "http_502");
        assert!(bare.is_transient());
    }

    #[test]
    fn not_found_maps_to_domain_variant() {
        let err = CoreError::from(botdesk_api::Error::Api {
            status: 404,
            message: "Bot not found".into(),
            code: None,
        });
        assert!(err.is_not_found());
    }

    #[test]
    fn session_expiry_goes_to_login() {
        let err = CoreError::from(botdesk_api::Error::SessionExpired {
            reason: LoginReason::SessionExpired,
        });
        assert!(err.requires_login());
        assert_eq!(err.notice().code, "session-expired");
    }
}
