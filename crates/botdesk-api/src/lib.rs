// botdesk-api: Async Rust client for the botdesk bot-management REST API
//
// Layers, leaves first: `transport` builds the reqwest client, `client`
// wraps it with bearer auth and single-flight token refresh, and the
// endpoint modules (`bots`, `session`, `version`) add inherent methods
// on `ApiClient`.

pub mod auth;
pub mod bots;
pub mod client;
pub mod error;
pub mod models;
pub mod session;
pub mod transport;
pub mod version;

pub use auth::{CredentialStore, LoginReason, TokenPair};
pub use client::ApiClient;
pub use error::{Error, FieldError};
pub use models::{
    AuthResponse, AuthUser, Bot, BulkDeleteResult, CreateBot, EntityId, ListParams, Page,
    RegisterRequest, SortOrder, UpdateBot, VersionInfo,
};
pub use transport::{TlsMode, TransportConfig};
