use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Why a caller is being sent back to the login flow.
///
/// Serialized as a kebab-case reason code (`session-expired`, `unauthorized`)
/// so consumers can carry it through a login redirect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum LoginReason {
    /// The token refresh endpoint rejected the session.
    SessionExpired,
    /// A request was still rejected after a successful refresh.
    Unauthorized,
}

/// Access token plus the optional refresh token returned alongside it.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access: SecretString,
    pub refresh: Option<SecretString>,
}

/// Where the client reads and writes its bearer credentials.
///
/// Implemented by the core auth store so the session has a single owner.
/// The client never persists anything itself.
pub trait CredentialStore: Send + Sync {
    /// Token to attach as `Authorization: Bearer ...`.
    fn access_token(&self) -> Option<SecretString>;

    /// Token sent to `/api/token` when the access token is rejected.
    fn refresh_token(&self) -> Option<SecretString>;

    /// Store tokens issued by a successful refresh.
    fn update_tokens(&self, tokens: &TokenPair);

    /// Clear the session; the caller has to log in again.
    fn session_expired(&self, reason: LoginReason);
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn reason_codes_are_kebab_case() {
        assert_eq!(LoginReason::SessionExpired.to_string(), "session-expired");
        assert_eq!(
            LoginReason::from_str("unauthorized").ok(),
            Some(LoginReason::Unauthorized)
        );
        assert_eq!(
            serde_json::to_string(&LoginReason::SessionExpired).ok().as_deref(),
            Some("\"session-expired\"")
        );
    }
}
