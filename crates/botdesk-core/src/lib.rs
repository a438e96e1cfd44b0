//! Query cache, optimistic CRUD hooks and client-side stores for botdesk.
//!
//! Sits between `botdesk-api` (wire types and HTTP) and consumers such as
//! the CLI. The [`Dashboard`] facade wires everything together:
//!
//! - [`EntityQueries`]: cached reads and optimistic create/update/delete
//!   for any [`Resource`], rolled back exactly on failure
//! - [`DebouncedSearch`]: pagination whose search term commits after a pause
//! - [`AuthStore`]: the persisted session, owner of the bearer tokens
//! - [`NotificationCenter`]: toasts and banners raised by the layers above
//! - [`SettingsStore`]: versioned, persisted `AppSettings`
//! - [`VersionWatcher`]: detects new deployments via `version.json`

pub mod auth;
pub mod cache;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod notifications;
pub mod pagination;
pub mod queries;
pub mod resource;
pub mod retry;
pub mod settings;
pub mod storage;
pub mod version;

pub use auth::{AuthEvent, AuthSession, AuthStore};
pub use cache::{CacheEntry, CacheSnapshot, QueryCache, QueryKey, QueryScope};
pub use config::{ClientConfig, DEFAULT_API_URL, TlsVerification};
pub use dashboard::{BotQueries, Dashboard};
pub use error::{CoreError, ErrorNotice};
pub use notifications::{Notification, NotificationCenter, NotificationKind, Placement};
pub use pagination::{DebouncedSearch, Pagination};
pub use queries::{EntityQueries, ListObserver, ListState};
pub use resource::{Resource, ResourceService};
pub use retry::RetryPolicy;
pub use settings::{AppSettings, SettingsStore};
pub use storage::{APP_CONFIG_KEY, AUTH_STORAGE_KEY, MemoryStorage, Storage};
pub use version::{VersionSource, VersionWatcher};

// Wire types consumers need alongside the core API.
pub use botdesk_api::{
    AuthUser, Bot, CreateBot, EntityId, ListParams, LoginReason, Page, RegisterRequest, SortOrder,
    UpdateBot, VersionInfo,
};
