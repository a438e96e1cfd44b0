// ── Dashboard facade ──
//
// Wires the stores, the API client and the per-entity query hooks into one
// cheaply cloneable handle, and owns the auth flows and background tasks.

use std::sync::Arc;

use botdesk_api::{ApiClient, AuthUser, Bot, CredentialStore, RegisterRequest, VersionInfo};
use secrecy::SecretString;
use tokio::sync::{Mutex, broadcast};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::auth::{AuthEvent, AuthStore};
use crate::config::ClientConfig;
use crate::error::CoreError;
use crate::notifications::NotificationCenter;
use crate::pagination::{DebouncedSearch, Pagination};
use crate::queries::EntityQueries;
use crate::settings::SettingsStore;
use crate::storage::Storage;
use crate::version::{VersionSource, VersionWatcher};

/// Cached CRUD access to bots.
pub type BotQueries = EntityQueries<Bot, ApiClient>;

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc<DashboardInner>`.
#[derive(Clone)]
pub struct Dashboard {
    inner: Arc<DashboardInner>,
}

struct DashboardInner {
    config: ClientConfig,
    client: Arc<ApiClient>,
    auth: Arc<AuthStore>,
    settings: SettingsStore,
    notifications: NotificationCenter,
    bots: BotQueries,
    cancel: CancellationToken,
    version_watcher: Mutex<Option<VersionWatcher>>,
}

impl Dashboard {
    /// Build from config and a persistence backend. Restores any saved
    /// session but makes no request; call [`auto_login`](Self::auto_login).
    pub fn new(config: ClientConfig, storage: Arc<dyn Storage>) -> Result<Self, CoreError> {
        let auth = Arc::new(AuthStore::load(Arc::clone(&storage)));
        let credentials: Arc<dyn CredentialStore> = auth.clone();
        let client = Arc::new(ApiClient::new(
            config.base_url.as_str(),
            &config.transport(),
            credentials,
        )?);
        let notifications = NotificationCenter::new();
        let bots = EntityQueries::new(
            Arc::clone(&client),
            notifications.clone(),
            config.retry.clone(),
            config.stale_time,
        );

        Ok(Self {
            inner: Arc::new(DashboardInner {
                settings: SettingsStore::load(storage),
                config,
                client,
                auth,
                notifications,
                bots,
                cancel: CancellationToken::new(),
                version_watcher: Mutex::new(None),
            }),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    pub fn client(&self) -> &Arc<ApiClient> {
        &self.inner.client
    }

    pub fn auth(&self) -> &AuthStore {
        &self.inner.auth
    }

    pub fn settings(&self) -> &SettingsStore {
        &self.inner.settings
    }

    pub fn notifications(&self) -> &NotificationCenter {
        &self.inner.notifications
    }

    pub fn bots(&self) -> &BotQueries {
        &self.inner.bots
    }

    // ── Auth flows ───────────────────────────────────────────────────

    pub async fn login(&self, email: &str, password: &SecretString) -> Result<AuthUser, CoreError> {
        let response = match self.inner.client.login(email, password).await {
            Ok(response) => response,
            Err(e) => return Err(self.report("Login failed", e.into())),
        };
        let user = response.user.clone();
        self.start_session(response.into())?;
        Ok(user)
    }

    pub async fn register(&self, request: &RegisterRequest) -> Result<AuthUser, CoreError> {
        let response = match self.inner.client.register(request).await {
            Ok(response) => response,
            Err(e) => return Err(self.report("Registration failed", e.into())),
        };
        let user = response.user.clone();
        self.start_session(response.into())?;
        Ok(user)
    }

    /// Confirm a restored session with `/api/me`.
    ///
    /// A rejected token clears the session without a notification and
    /// yields `Ok(None)`. Network failures are returned as errors and
    /// leave the session in place.
    pub async fn auto_login(&self) -> Result<Option<AuthUser>, CoreError> {
        if !self.inner.auth.is_authenticated() {
            return Ok(None);
        }
        match self.inner.client.me().await {
            Ok(user) => {
                debug!(user = %user.email, "session restored");
                self.inner.auth.set_user(user.clone())?;
                Ok(Some(user))
            }
            Err(e) if e.status() == Some(401) => {
                info!("stored session rejected, clearing");
                self.inner.auth.clear()?;
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn logout(&self) -> Result<(), CoreError> {
        self.inner.bots.cache().clear();
        self.inner.auth.clear()
    }

    pub fn current_user(&self) -> Option<AuthUser> {
        self.inner.auth.user()
    }

    /// The logged-in user, or `NotAuthenticated`.
    pub fn require_user(&self) -> Result<AuthUser, CoreError> {
        self.current_user().ok_or(CoreError::NotAuthenticated)
    }

    pub fn auth_events(&self) -> broadcast::Receiver<AuthEvent> {
        self.inner.auth.subscribe()
    }

    fn start_session(&self, session: crate::auth::AuthSession) -> Result<(), CoreError> {
        self.inner.bots.cache().clear();
        self.inner.auth.set_session(session)
    }

    /// Toast an error unless it belongs on the login path, then hand it back.
    fn report(&self, title: &str, err: CoreError) -> CoreError {
        if !err.requires_login() {
            self.inner.notifications.error(title, &err);
        }
        err
    }

    // ── List helpers ─────────────────────────────────────────────────

    /// Fresh pagination sized from the current settings.
    pub fn pagination(&self) -> Pagination {
        Pagination::new(self.inner.settings.get().items_per_page)
    }

    /// Debounced search over `pagination` using the configured delay.
    /// Stops on shutdown.
    pub fn debounced_search(&self, pagination: Pagination) -> DebouncedSearch {
        DebouncedSearch::spawn(
            pagination,
            self.inner.settings.get().debounce_delay,
            &self.inner.cancel,
        )
    }

    // ── Deployment version ───────────────────────────────────────────

    pub async fn check_version(&self) -> Result<VersionInfo, CoreError> {
        VersionSource::fetch_version(self.inner.client.as_ref()).await
    }

    /// Start polling `version.json`. No-op when disabled or already running.
    pub async fn start_version_watch(&self) -> bool {
        let interval = self.inner.config.version_poll_interval;
        if interval.is_zero() {
            return false;
        }
        let mut slot = self.inner.version_watcher.lock().await;
        if slot.is_some() {
            return false;
        }
        *slot = Some(VersionWatcher::spawn(
            Arc::clone(&self.inner.client),
            self.inner.notifications.clone(),
            interval,
            &self.inner.cancel,
        ));
        true
    }

    pub async fn update_available(&self) -> Option<VersionInfo> {
        self.inner
            .version_watcher
            .lock()
            .await
            .as_ref()
            .and_then(VersionWatcher::update_available)
    }

    /// Stop background tasks (version watcher, debounced searches).
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();
        if let Some(watcher) = self.inner.version_watcher.lock().await.take() {
            watcher.shutdown().await;
        }
    }
}
