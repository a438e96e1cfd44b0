// Authenticated HTTP client for the botdesk REST API
//
// Wraps `reqwest::Client` with base-URL handling, bearer-token injection
// and the 401 -> refresh -> replay cycle. Endpoint modules (bots, session,
// version) are implemented as inherent methods in separate files to keep
// this module focused on transport mechanics.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use reqwest::{Method, StatusCode};
use secrecy::ExposeSecret;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tracing::{debug, info, trace, warn};
use url::Url;

use crate::auth::{CredentialStore, LoginReason};
use crate::error::{Error, FieldError};
use crate::transport::TransportConfig;

// ── Error response shapes ────────────────────────────────────────────

#[derive(serde::Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    code: Option<serde_json::Value>,
    #[serde(default)]
    errors: Option<Vec<FieldError>>,
}

// ── Request descriptor ───────────────────────────────────────────────

/// How a request authenticates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AuthMode {
    /// No bearer token (login, register, token refresh, version probe).
    Anonymous,
    /// Bearer token, but a 401 is reported as-is (`/api/me`).
    Bearer,
    /// Bearer token; a 401 triggers one refresh and one replay.
    Refreshable,
}

/// A replayable request: everything needed to send it again after a refresh.
#[derive(Debug, Clone)]
pub(crate) struct ApiRequest {
    method: Method,
    path: String,
    query: Vec<(&'static str, String)>,
    body: Option<serde_json::Value>,
    auth: AuthMode,
}

impl ApiRequest {
    fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            auth: AuthMode::Refreshable,
        }
    }

    pub(crate) fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub(crate) fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub(crate) fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub(crate) fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub(crate) fn query(mut self, query: Vec<(&'static str, String)>) -> Self {
        self.query = query;
        self
    }

    pub(crate) fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, Error> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }

    pub(crate) fn auth(mut self, auth: AuthMode) -> Self {
        self.auth = auth;
        self
    }
}

// ── Refresh coordination ─────────────────────────────────────────────

/// Single-flight gate for token refreshes.
///
/// Every request records the generation it was sent under. A 401 only
/// triggers a refresh if no other caller has refreshed since; otherwise
/// the request waits on the mutex and replays with the new token.
#[derive(Default)]
struct RefreshGate {
    generation: AtomicU64,
    /// Generation at which the last refresh failed, with the reason.
    last_failure: Mutex<Option<(u64, LoginReason)>>,
}

// ── Client ───────────────────────────────────────────────────────────

/// Async client for the botdesk REST API.
///
/// One shared instance per application. Credentials are read from the
/// [`CredentialStore`] on every request, so logging in or out through the
/// store takes effect immediately.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    credentials: Arc<dyn CredentialStore>,
    refresh: RefreshGate,
    timeout_secs: u64,
}

impl ApiClient {
    // ── Constructors ─────────────────────────────────────────────────

    /// Build from a base URL and transport config.
    pub fn new(
        base_url: &str,
        transport: &TransportConfig,
        credentials: Arc<dyn CredentialStore>,
    ) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self {
            http,
            base_url: Self::normalize_base_url(base_url)?,
            credentials,
            refresh: RefreshGate::default(),
            timeout_secs: transport.timeout_secs(),
        })
    }

    /// Wrap an existing `reqwest::Client`.
    pub fn with_client(
        http: reqwest::Client,
        base_url: &str,
        credentials: Arc<dyn CredentialStore>,
    ) -> Result<Self, Error> {
        Ok(Self {
            http,
            base_url: Self::normalize_base_url(base_url)?,
            credentials,
            refresh: RefreshGate::default(),
            timeout_secs: 0,
        })
    }

    /// Ensure the base path ends with `/` so relative joins keep any prefix.
    fn normalize_base_url(raw: &str) -> Result<Url, Error> {
        let mut url = Url::parse(raw)?;
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        Ok(url)
    }

    /// The backend base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The credential store this client authenticates with.
    pub fn credentials(&self) -> &Arc<dyn CredentialStore> {
        &self.credentials
    }

    fn url(&self, path: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }

    // ── Request execution ────────────────────────────────────────────

    /// Send once, with whatever token the store holds right now.
    async fn dispatch(&self, req: &ApiRequest) -> Result<reqwest::Response, Error> {
        let url = self.url(&req.path)?;
        debug!("{} {url}", req.method);

        let mut builder = self.http.request(req.method.clone(), url);
        if !req.query.is_empty() {
            builder = builder.query(&req.query);
        }
        if let Some(ref body) = req.body {
            builder = builder.json(body);
        }
        if req.auth != AuthMode::Anonymous {
            if let Some(token) = self.credentials.access_token() {
                builder = builder.bearer_auth(token.expose_secret());
            }
        }

        builder.send().await.map_err(|e| {
            if e.is_timeout() {
                Error::Timeout {
                    timeout_secs: self.timeout_secs,
                }
            } else {
                Error::Transport(e)
            }
        })
    }

    /// Send, and on a 401 refresh the session once and replay.
    async fn execute(&self, req: &ApiRequest) -> Result<reqwest::Response, Error> {
        let seen = self.refresh.generation.load(Ordering::Acquire);
        let resp = self.dispatch(req).await?;

        if resp.status() != StatusCode::UNAUTHORIZED || req.auth != AuthMode::Refreshable {
            return Ok(resp);
        }

        debug!(path = %req.path, "access token rejected, refreshing session");
        self.refresh_session(seen).await?;

        let replay = self.dispatch(req).await?;
        if replay.status() == StatusCode::UNAUTHORIZED {
            warn!(path = %req.path, "request rejected again after token refresh");
            self.credentials.session_expired(LoginReason::Unauthorized);
            return Err(Error::SessionExpired {
                reason: LoginReason::Unauthorized,
            });
        }
        Ok(replay)
    }

    /// Refresh the session unless someone already did since `seen`.
    async fn refresh_session(&self, seen: u64) -> Result<(), Error> {
        let mut last_failure = self.refresh.last_failure.lock().await;
        let current = self.refresh.generation.load(Ordering::Acquire);

        if current != seen {
            trace!(seen, current, "refresh already completed by another request");
            return match *last_failure {
                Some((generation, reason)) if generation == current => {
                    Err(Error::SessionExpired { reason })
                }
                _ => Ok(()),
            };
        }

        let refresh_token = self.credentials.refresh_token();
        let result = self.request_token(refresh_token.as_ref()).await;
        let next = current + 1;

        // Tokens land in the store before the new generation is visible, so
        // nothing can be sent under `next` with the stale token.
        let outcome = match result {
            Ok(tokens) => {
                self.credentials.update_tokens(&tokens);
                *last_failure = None;
                info!("session refreshed");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "token refresh failed, login required");
                let reason = LoginReason::SessionExpired;
                self.credentials.session_expired(reason);
                *last_failure = Some((next, reason));
                Err(Error::SessionExpired { reason })
            }
        };
        self.refresh.generation.store(next, Ordering::Release);
        outcome
    }

    // ── Typed helpers used by endpoint modules ───────────────────────

    pub(crate) async fn fetch<T: DeserializeOwned>(&self, req: ApiRequest) -> Result<T, Error> {
        let resp = self.execute(&req).await?;
        handle_response(resp).await
    }

    pub(crate) async fn fetch_empty(&self, req: ApiRequest) -> Result<(), Error> {
        let resp = self.execute(&req).await?;
        handle_empty(resp).await
    }

    /// Send without the refresh cycle. Used by the refresh call itself.
    pub(crate) async fn fetch_direct<T: DeserializeOwned>(
        &self,
        req: ApiRequest,
    ) -> Result<T, Error> {
        let resp = self.dispatch(&req).await?;
        handle_response(resp).await
    }
}

// ── Response handling ────────────────────────────────────────────────

async fn handle_response<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, Error> {
    let status = resp.status();
    if status.is_success() {
        let body = resp.text().await?;
        serde_json::from_str(&body).map_err(|e| {
            let preview: String = body.chars().take(200).collect();
            Error::Deserialization {
                message: format!("{e} (body preview: {preview:?})"),
                body,
            }
        })
    } else {
        Err(parse_error(status, resp).await)
    }
}

async fn handle_empty(resp: reqwest::Response) -> Result<(), Error> {
    let status = resp.status();
    if status.is_success() {
        Ok(())
    } else {
        Err(parse_error(status, resp).await)
    }
}

async fn parse_error(status: StatusCode, resp: reqwest::Response) -> Error {
    let raw = resp.text().await.unwrap_or_default();
    classify_error(status, &raw)
}

/// Classify an error body by status and payload shape.
pub(crate) fn classify_error(status: StatusCode, raw: &str) -> Error {
    let parsed = serde_json::from_str::<ErrorBody>(raw).ok();

    let message = parsed
        .as_ref()
        .and_then(|b| b.message.clone().or_else(|| b.error.clone()))
        .filter(|m| !m.is_empty());

    if status == StatusCode::UNAUTHORIZED {
        return Error::Authentication {
            message: message.unwrap_or_else(|| "unauthorized".into()),
        };
    }

    match parsed {
        Some(ErrorBody {
            errors: Some(errors),
            ..
        }) if !errors.is_empty() => Error::Validation {
            status: status.as_u16(),
            errors,
        },
        Some(body) => Error::Api {
            status: status.as_u16(),
            message: message.unwrap_or_else(|| status.to_string()),
            code: body.code.map(|c| match c {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            }),
        },
        None => Error::Api {
            status: status.as_u16(),
            message: if raw.trim().is_empty() {
                status.to_string()
            } else {
                raw.to_owned()
            },
            code: None,
        },
    }
}
