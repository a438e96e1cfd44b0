// ── Auth session store ──
//
// Single owner of the bearer credentials. The API client reads tokens
// through `CredentialStore`; login, refresh and logout write them here.
// The session is persisted under `auth-storage` and every transition is
// broadcast as an `AuthEvent`.

use std::sync::Arc;

use arc_swap::ArcSwapOption;
use botdesk_api::{AuthResponse, AuthUser, CredentialStore, LoginReason, TokenPair};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::error::CoreError;
use crate::storage::{AUTH_STORAGE_KEY, Storage, load_envelope, save_envelope};

const AUTH_STORAGE_VERSION: u32 = 0;
const EVENT_CHANNEL_SIZE: usize = 16;

/// A logged-in session.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub token: SecretString,
    pub refresh_token: Option<SecretString>,
    pub user: AuthUser,
}

impl From<AuthResponse> for AuthSession {
    fn from(resp: AuthResponse) -> Self {
        let tokens = resp.tokens();
        Self {
            token: tokens.access,
            refresh_token: tokens.refresh,
            user: resp.user,
        }
    }
}

/// Session transitions observable by consumers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    LoggedIn(AuthUser),
    LoggedOut,
    /// The session was dropped by the client; route through login.
    LoginRequired { reason: LoginReason },
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PersistedAuth {
    token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
    user: Option<AuthUser>,
    #[serde(default)]
    is_authenticated: bool,
}

pub struct AuthStore {
    session: ArcSwapOption<AuthSession>,
    storage: Arc<dyn Storage>,
    events: broadcast::Sender<AuthEvent>,
}

impl AuthStore {
    /// Restore the persisted session, if any. A corrupt blob is dropped.
    pub fn load(storage: Arc<dyn Storage>) -> Self {
        let session = match read_session(storage.as_ref()) {
            Ok(session) => session,
            Err(e) => {
                warn!(error = %e, "discarding unreadable auth session");
                None
            }
        };
        let (events, _) = broadcast::channel(EVENT_CHANNEL_SIZE);
        Self {
            session: ArcSwapOption::from(session.map(Arc::new)),
            storage,
            events,
        }
    }

    pub fn session(&self) -> Option<Arc<AuthSession>> {
        self.session.load_full()
    }

    pub fn user(&self) -> Option<AuthUser> {
        self.session().map(|s| s.user.clone())
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.load().is_some()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }

    /// Install a new session (login, register).
    pub fn set_session(&self, session: AuthSession) -> Result<(), CoreError> {
        let user = session.user.clone();
        self.store(Some(session))?;
        info!(user = %user.email, "logged in");
        let _ = self.events.send(AuthEvent::LoggedIn(user));
        Ok(())
    }

    /// Replace the user record, keeping the tokens.
    pub fn set_user(&self, user: AuthUser) -> Result<(), CoreError> {
        let Some(current) = self.session() else {
            return Err(CoreError::NotAuthenticated);
        };
        let mut next = (*current).clone();
        next.user = user;
        self.store(Some(next))
    }

    /// Log out locally.
    pub fn clear(&self) -> Result<(), CoreError> {
        let had_session = self.is_authenticated();
        self.store(None)?;
        if had_session {
            info!("logged out");
            let _ = self.events.send(AuthEvent::LoggedOut);
        }
        Ok(())
    }

    fn store(&self, session: Option<AuthSession>) -> Result<(), CoreError> {
        let result = match &session {
            Some(s) => save_envelope(
                self.storage.as_ref(),
                AUTH_STORAGE_KEY,
                &PersistedAuth {
                    token: Some(s.token.expose_secret().to_owned()),
                    refresh_token: s.refresh_token.as_ref().map(|t| t.expose_secret().to_owned()),
                    user: Some(s.user.clone()),
                    is_authenticated: true,
                },
                AUTH_STORAGE_VERSION,
            ),
            None => self.storage.remove(AUTH_STORAGE_KEY),
        };
        // The in-memory session wins even if persisting failed.
        self.session.store(session.map(Arc::new));
        result
    }
}

impl CredentialStore for AuthStore {
    fn access_token(&self) -> Option<SecretString> {
        self.session().map(|s| s.token.clone())
    }

    fn refresh_token(&self) -> Option<SecretString> {
        self.session().and_then(|s| s.refresh_token.clone())
    }

    fn update_tokens(&self, tokens: &TokenPair) {
        let Some(current) = self.session() else {
            warn!("token refresh finished after logout, ignoring");
            return;
        };
        let mut next = (*current).clone();
        next.token = tokens.access.clone();
        if let Some(ref refresh) = tokens.refresh {
            next.refresh_token = Some(refresh.clone());
        }
        if let Err(e) = self.store(Some(next)) {
            warn!(error = %e, "failed to persist refreshed tokens");
        }
    }

    fn session_expired(&self, reason: LoginReason) {
        warn!(%reason, "session expired");
        if let Err(e) = self.store(None) {
            warn!(error = %e, "failed to clear persisted session");
        }
        let _ = self.events.send(AuthEvent::LoginRequired { reason });
    }
}

fn read_session(storage: &dyn Storage) -> Result<Option<AuthSession>, CoreError> {
    let Some(envelope) = load_envelope(storage, AUTH_STORAGE_KEY)? else {
        return Ok(None);
    };
    let persisted: PersistedAuth = serde_json::from_value(envelope.state)?;
    Ok(match persisted {
        PersistedAuth {
            token: Some(token),
            refresh_token,
            user: Some(user),
            is_authenticated: true,
        } => Some(AuthSession {
            token: SecretString::from(token),
            refresh_token: refresh_token.map(SecretString::from),
            user,
        }),
        _ => None,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use botdesk_api::EntityId;
    use serde_json::json;

    use super::*;
    use crate::storage::MemoryStorage;

    fn user() -> AuthUser {
        serde_json::from_value(json!({ "id": "u1", "email": "ops@example.com" })).unwrap()
    }

    fn session(token: &str) -> AuthSession {
        AuthSession {
            token: SecretString::from(token.to_owned()),
            refresh_token: Some(SecretString::from("r1".to_owned())),
            user: user(),
        }
    }

    #[test]
    fn session_survives_reload() {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        let store = AuthStore::load(Arc::clone(&storage));
        store.set_session(session("t1")).unwrap();

        let reloaded = AuthStore::load(storage);
        assert_eq!(reloaded.access_token().unwrap().expose_secret(), "t1");
        assert_eq!(reloaded.user().unwrap().id, EntityId::from("u1"));
    }

    #[test]
    fn refreshed_tokens_keep_old_refresh_token_when_absent() {
        let store = AuthStore::load(Arc::new(MemoryStorage::new()));
        store.set_session(session("t1")).unwrap();
        store.update_tokens(&TokenPair {
            access: SecretString::from("t2".to_owned()),
            refresh: None,
        });
        assert_eq!(store.access_token().unwrap().expose_secret(), "t2");
        assert_eq!(store.refresh_token().unwrap().expose_secret(), "r1");
    }

    #[test]
    fn expiry_clears_and_broadcasts_reason() {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        let store = AuthStore::load(Arc::clone(&storage));
        store.set_session(session("t1")).unwrap();
        let mut events = store.subscribe();

        store.session_expired(LoginReason::SessionExpired);

        assert!(!store.is_authenticated());
        assert!(storage.load(AUTH_STORAGE_KEY).unwrap().is_none());
        assert_eq!(
            events.try_recv().unwrap(),
            AuthEvent::LoginRequired {
                reason: LoginReason::SessionExpired
            }
        );
    }

    #[test]
    fn logout_only_announces_when_logged_in() {
        let store = AuthStore::load(Arc::new(MemoryStorage::new()));
        let mut events = store.subscribe();
        store.clear().unwrap();
        assert!(events.try_recv().is_err());

        store.set_session(session("t1")).unwrap();
        store.clear().unwrap();
        assert!(matches!(events.try_recv().unwrap(), AuthEvent::LoggedIn(_)));
        assert_eq!(events.try_recv().unwrap(), AuthEvent::LoggedOut);
    }

    #[test]
    fn unauthenticated_blob_restores_nothing() {
        let storage = Arc::new(MemoryStorage::new());
        storage
            .save(
                AUTH_STORAGE_KEY,
                &json!({
                    "state": { "token": null, "user": null, "isAuthenticated": false },
                    "version": 0
                })
                .to_string(),
            )
            .unwrap();
        assert!(!AuthStore::load(storage).is_authenticated());
    }
}
