// Wire types for the botdesk REST API.
//
// Field names follow the backend's camelCase JSON. Tokens arrive as plain
// strings and are wrapped in `SecretString` as soon as they leave this module.

use std::fmt;

use chrono::{DateTime, Utc};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::TokenPair;

// ── EntityId ────────────────────────────────────────────────────────

const TEMPORARY_PREFIX: &str = "temp-";

/// Backend identifier for any entity.
///
/// Records inserted optimistically before the server answers carry a
/// `temp-` prefixed id; everything else is whatever the backend issued.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// A fresh client-side placeholder id.
    pub fn temporary() -> Self {
        Self(format!("{TEMPORARY_PREFIX}{}", Uuid::new_v4()))
    }

    pub fn is_temporary(&self) -> bool {
        self.0.starts_with(TEMPORARY_PREFIX)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for EntityId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

// ── Bots ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bot {
    pub id: EntityId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Payload for `POST /api/v1/bots`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBot {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

/// Payload for `PUT /api/v1/bots/:id`. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

impl UpdateBot {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none() && self.is_active.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkDeleteResult {
    #[serde(default)]
    pub deleted: u64,
}

// ── Pagination ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

/// Pagination, filter and sort parameters for list endpoints.
///
/// Doubles as the list half of a cache key, so it is `Hash + Eq`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    pub page: u32,
    pub page_size: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<String>,
    #[serde(default)]
    pub sort_order: SortOrder,
}

impl Default for ListParams {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: 10,
            search: None,
            sort_by: None,
            sort_order: SortOrder::default(),
        }
    }
}

impl ListParams {
    pub fn new(page: u32, page_size: u32) -> Self {
        Self {
            page: page.max(1),
            page_size: page_size.max(1),
            ..Self::default()
        }
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        let search = search.into();
        self.search = if search.trim().is_empty() {
            None
        } else {
            Some(search)
        };
        self
    }

    pub fn with_sort(mut self, sort_by: impl Into<String>, order: SortOrder) -> Self {
        self.sort_by = Some(sort_by.into());
        self.sort_order = order;
        self
    }

    /// Query-string pairs in the order the backend documents them.
    pub fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut query = vec![
            ("page", self.page.to_string()),
            ("pageSize", self.page_size.to_string()),
        ];
        if let Some(ref search) = self.search {
            query.push(("search", search.clone()));
        }
        if let Some(ref sort_by) = self.sort_by {
            query.push(("sortBy", sort_by.clone()));
            query.push(("sortOrder", self.sort_order.as_str().to_owned()));
        }
        query
    }
}

/// One page of a list endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub data: Vec<T>,
    #[serde(default)]
    pub total: u64,
    #[serde(default = "first_page")]
    pub page: u32,
    #[serde(default)]
    pub page_size: u32,
}

fn first_page() -> u32 {
    1
}

impl<T> Page<T> {
    pub fn empty(params: &ListParams) -> Self {
        Self {
            data: Vec::new(),
            total: 0,
            page: params.page,
            page_size: params.page_size,
        }
    }

    pub fn total_pages(&self) -> u64 {
        if self.page_size == 0 {
            return 1;
        }
        self.total.div_ceil(u64::from(self.page_size)).max(1)
    }
}

// ── Auth ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthUser {
    pub id: EntityId,
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub is_verified: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl AuthUser {
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name, self.last_name);
        let full = full.trim();
        if full.is_empty() {
            self.email.clone()
        } else {
            full.to_owned()
        }
    }
}

/// Payload for `POST /api/register`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

/// Response of `/api/login` and `/api/register`.
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub user: AuthUser,
}

impl fmt::Debug for AuthResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthResponse")
            .field("token", &"[REDACTED]")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "[REDACTED]"))
            .field("user", &self.user)
            .finish()
    }
}

impl AuthResponse {
    pub fn tokens(&self) -> TokenPair {
        TokenPair {
            access: SecretString::from(self.token.clone()),
            refresh: self.refresh_token.clone().map(SecretString::from),
        }
    }
}

/// Response of `POST /api/token`.
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

impl From<TokenResponse> for TokenPair {
    fn from(resp: TokenResponse) -> Self {
        Self {
            access: SecretString::from(resp.token),
            refresh: resp.refresh_token.map(SecretString::from),
        }
    }
}

// ── Deployment ──────────────────────────────────────────────────────

/// Contents of the deployed `version.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionInfo {
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_time: Option<DateTime<Utc>>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn temporary_ids_are_recognized() {
        let id = EntityId::temporary();
        assert!(id.is_temporary());
        assert!(!EntityId::from("bot_42").is_temporary());
        assert_eq!(EntityId::from("temp-123").to_string(), "temp-123");
    }

    #[test]
    fn bot_deserializes_camel_case() {
        let bot: Bot = serde_json::from_value(json!({
            "id": "b1",
            "name": "Support",
            "isActive": true,
            "createdAt": "2024-06-15T10:30:00Z",
            "updatedAt": "2024-06-15T10:35:00Z"
        }))
        .unwrap();
        assert_eq!(bot.id, EntityId::from("b1"));
        assert!(bot.is_active);
        assert_eq!(bot.description, None);
    }

    #[test]
    fn list_params_query_skips_empty_search() {
        let params = ListParams::new(2, 20).with_search("   ");
        assert_eq!(
            params.to_query(),
            vec![("page", "2".to_owned()), ("pageSize", "20".to_owned())]
        );

        let sorted = ListParams::new(1, 10)
            .with_search("sup")
            .with_sort("name", SortOrder::Asc);
        assert_eq!(
            sorted.to_query(),
            vec![
                ("page", "1".to_owned()),
                ("pageSize", "10".to_owned()),
                ("search", "sup".to_owned()),
                ("sortBy", "name".to_owned()),
                ("sortOrder", "asc".to_owned()),
            ]
        );
    }

    #[test]
    fn list_params_clamp_page_to_one() {
        let params = ListParams::new(0, 0);
        assert_eq!(params.page, 1);
        assert_eq!(params.page_size, 1);
    }

    #[test]
    fn total_pages_rounds_up() {
        let page: Page<Bot> = Page {
            data: Vec::new(),
            total: 21,
            page: 1,
            page_size: 10,
        };
        assert_eq!(page.total_pages(), 3);
        assert_eq!(Page::<Bot>::empty(&ListParams::default()).total_pages(), 1);
    }

    #[test]
    fn auth_response_debug_redacts_tokens() {
        let resp: AuthResponse = serde_json::from_value(json!({
            "token": "secret-access",
            "refreshToken": "secret-refresh",
            "user": { "id": "u1", "email": "ops@example.com" }
        }))
        .unwrap();
        let debug = format!("{resp:?}");
        assert!(!debug.contains("secret-access"));
        assert!(!debug.contains("secret-refresh"));
        assert_eq!(resp.user.display_name(), "ops@example.com");
    }

    #[test]
    fn update_without_fields_is_empty() {
        assert!(UpdateBot::default().is_empty());
        let update = UpdateBot {
            is_active: Some(false),
            ..UpdateBot::default()
        };
        assert!(!update.is_empty());
        assert_eq!(serde_json::to_value(&update).unwrap(), json!({ "isActive": false }));
    }
}
