#![allow(clippy::unwrap_used)]
// Integration tests for `ApiClient` using wiremock.

use std::sync::{Arc, Mutex};

use pretty_assertions::assert_eq;
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use botdesk_api::{
    ApiClient, CreateBot, CredentialStore, EntityId, Error, ListParams, LoginReason, TokenPair,
};

// ── Helpers ─────────────────────────────────────────────────────────

#[derive(Default)]
struct TestCredentials {
    access: Mutex<Option<String>>,
    refresh: Mutex<Option<String>>,
    expired: Mutex<Vec<LoginReason>>,
}

impl TestCredentials {
    fn with_tokens(access: &str, refresh: &str) -> Arc<Self> {
        let creds = Self::default();
        *creds.access.lock().unwrap() = Some(access.into());
        *creds.refresh.lock().unwrap() = Some(refresh.into());
        Arc::new(creds)
    }

    fn access(&self) -> Option<String> {
        self.access.lock().unwrap().clone()
    }

    fn expired(&self) -> Vec<LoginReason> {
        self.expired.lock().unwrap().clone()
    }
}

impl CredentialStore for TestCredentials {
    fn access_token(&self) -> Option<SecretString> {
        self.access().map(SecretString::from)
    }

    fn refresh_token(&self) -> Option<SecretString> {
        self.refresh.lock().unwrap().clone().map(SecretString::from)
    }

    fn update_tokens(&self, tokens: &TokenPair) {
        *self.access.lock().unwrap() = Some(tokens.access.expose_secret().to_owned());
        if let Some(ref refresh) = tokens.refresh {
            *self.refresh.lock().unwrap() = Some(refresh.expose_secret().to_owned());
        }
    }

    fn session_expired(&self, reason: LoginReason) {
        *self.access.lock().unwrap() = None;
        *self.refresh.lock().unwrap() = None;
        self.expired.lock().unwrap().push(reason);
    }
}

async fn setup(creds: Arc<TestCredentials>) -> (MockServer, ApiClient) {
    let server = MockServer::start().await;
    let client = ApiClient::with_client(reqwest::Client::new(), &server.uri(), creds).unwrap();
    (server, client)
}

fn bot_json(id: &str, name: &str) -> serde_json::Value {
    json!({
        "id": id,
        "name": name,
        "isActive": true,
        "createdAt": "2024-06-15T10:30:00Z",
        "updatedAt": "2024-06-15T10:30:00Z"
    })
}

fn page_json(bots: Vec<serde_json::Value>) -> serde_json::Value {
    let total = bots.len();
    json!({ "data": bots, "total": total, "page": 1, "pageSize": 10 })
}

// ── Bot endpoint tests ──────────────────────────────────────────────

#[tokio::test]
async fn test_list_bots_sends_bearer_and_params() {
    let creds = TestCredentials::with_tokens("tok", "ref");
    let (server, client) = setup(creds).await;

    Mock::given(method("GET"))
        .and(path("/api/v1/bots"))
        .and(header("authorization", "Bearer tok"))
        .and(query_param("page", "2"))
        .and(query_param("pageSize", "5"))
        .and(query_param("search", "sup"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_json(vec![bot_json(
            "b1", "Support",
        )])))
        .expect(1)
        .mount(&server)
        .await;

    let page = client
        .list_bots(&ListParams::new(2, 5).with_search("sup"))
        .await
        .unwrap();

    assert_eq!(page.data.len(), 1);
    assert_eq!(page.data[0].name, "Support");
    assert_eq!(page.total, 1);
}

#[tokio::test]
async fn test_create_bot_posts_payload() {
    let (server, client) = setup(TestCredentials::with_tokens("tok", "ref")).await;

    Mock::given(method("POST"))
        .and(path("/api/v1/bots"))
        .and(body_json(json!({ "name": "Support", "isActive": true })))
        .respond_with(ResponseTemplate::new(201).set_body_json(bot_json("b9", "Support")))
        .mount(&server)
        .await;

    let bot = client
        .create_bot(&CreateBot {
            name: "Support".into(),
            description: None,
            is_active: true,
        })
        .await
        .unwrap();

    assert_eq!(bot.id, EntityId::from("b9"));
}

#[tokio::test]
async fn test_bulk_delete_sends_ids() {
    let (server, client) = setup(TestCredentials::with_tokens("tok", "ref")).await;

    Mock::given(method("DELETE"))
        .and(path("/api/v1/bots/bulk"))
        .and(body_json(json!({ "ids": ["b1", "b2"] })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "deleted": 2 })))
        .mount(&server)
        .await;

    let result = client
        .bulk_delete_bots(&[EntityId::from("b1"), EntityId::from("b2")])
        .await
        .unwrap();

    assert_eq!(result.deleted, 2);
}

#[tokio::test]
async fn test_delete_bot_accepts_empty_body() {
    let (server, client) = setup(TestCredentials::with_tokens("tok", "ref")).await;

    Mock::given(method("DELETE"))
        .and(path("/api/v1/bots/b1"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    client.delete_bot(&EntityId::from("b1")).await.unwrap();
}

#[tokio::test]
async fn test_validation_error_payload() {
    let (server, client) = setup(TestCredentials::with_tokens("tok", "ref")).await;

    Mock::given(method("POST"))
        .and(path("/api/v1/bots"))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({
            "errors": [{ "field": "name", "message": "is too long" }]
        })))
        .mount(&server)
        .await;

    let result = client
        .create_bot(&CreateBot {
            name: "x".repeat(300),
            description: None,
            is_active: true,
        })
        .await;

    match result {
        Err(Error::Validation { status, ref errors }) => {
            assert_eq!(status, 422);
            assert_eq!(errors[0].field, "name");
        }
        other => panic!("expected Validation error, got: {other:?}"),
    }
}

// ── Token refresh tests ─────────────────────────────────────────────

#[tokio::test]
async fn test_concurrent_401s_share_one_refresh() {
    let creds = TestCredentials::with_tokens("stale", "refresh-1");
    let (server, client) = setup(Arc::clone(&creds)).await;

    Mock::given(method("GET"))
        .and(path("/api/v1/bots"))
        .and(header("authorization", "Bearer stale"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v1/bots"))
        .and(header("authorization", "Bearer fresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_json(vec![])))
        .expect(3)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/token"))
        .and(body_json(json!({ "refreshToken": "refresh-1" })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "token": "fresh", "refreshToken": "refresh-2" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let params = ListParams::default();
    let (a, b, c) = tokio::join!(
        client.list_bots(&params),
        client.list_bots(&params),
        client.list_bots(&params),
    );

    assert!(a.is_ok() && b.is_ok() && c.is_ok());
    assert_eq!(creds.access().as_deref(), Some("fresh"));
    assert!(creds.expired().is_empty());
    server.verify().await;
}

#[tokio::test]
async fn test_failed_refresh_expires_session_once() {
    let creds = TestCredentials::with_tokens("stale", "refresh-1");
    let (server, client) = setup(Arc::clone(&creds)).await;

    Mock::given(method("GET"))
        .and(path("/api/v1/bots"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/token"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "message": "expired" })))
        .expect(1)
        .mount(&server)
        .await;

    let params = ListParams::default();
    let (a, b) = tokio::join!(client.list_bots(&params), client.list_bots(&params));

    for result in [a, b] {
        assert!(
            matches!(
                result,
                Err(Error::SessionExpired {
                    reason: LoginReason::SessionExpired
                })
            ),
            "expected SessionExpired, got: {result:?}"
        );
    }
    assert_eq!(creds.expired(), vec![LoginReason::SessionExpired]);
    assert_eq!(creds.access(), None);
    server.verify().await;
}

#[tokio::test]
async fn test_replay_rejected_again_is_unauthorized() {
    let creds = TestCredentials::with_tokens("stale", "refresh-1");
    let (server, client) = setup(Arc::clone(&creds)).await;

    Mock::given(method("GET"))
        .and(path("/api/v1/bots/b1"))
        .respond_with(ResponseTemplate::new(401))
        .expect(2)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "token": "fresh" })))
        .expect(1)
        .mount(&server)
        .await;

    let result = client.get_bot(&EntityId::from("b1")).await;

    assert!(matches!(
        result,
        Err(Error::SessionExpired {
            reason: LoginReason::Unauthorized
        })
    ));
    assert_eq!(creds.expired(), vec![LoginReason::Unauthorized]);
    server.verify().await;
}

#[tokio::test]
async fn test_me_401_never_refreshes() {
    let (server, client) = setup(TestCredentials::with_tokens("stale", "refresh-1")).await;

    Mock::given(method("GET"))
        .and(path("/api/me"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "token": "fresh" })))
        .expect(0)
        .mount(&server)
        .await;

    let result = client.me().await;

    assert!(matches!(result, Err(Error::Authentication { .. })));
    server.verify().await;
}

// ── Session tests ───────────────────────────────────────────────────

#[tokio::test]
async fn test_login_success() {
    let (server, client) = setup(Arc::new(TestCredentials::default())).await;

    Mock::given(method("POST"))
        .and(path("/api/login"))
        .and(body_json(json!({ "email": "ops@example.com", "password": "hunter2" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token": "access",
            "refreshToken": "refresh",
            "user": { "id": "u1", "email": "ops@example.com", "firstName": "Ops", "role": "admin" }
        })))
        .mount(&server)
        .await;

    let secret = SecretString::from("hunter2".to_owned());
    let resp = client.login("ops@example.com", &secret).await.unwrap();

    assert_eq!(resp.user.role, "admin");
    assert_eq!(resp.tokens().access.expose_secret(), "access");
}

#[tokio::test]
async fn test_login_failure() {
    let (server, client) = setup(Arc::new(TestCredentials::default())).await;

    Mock::given(method("POST"))
        .and(path("/api/login"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({ "message": "Invalid credentials" })),
        )
        .mount(&server)
        .await;

    let secret = SecretString::from("wrong".to_owned());
    let result = client.login("ops@example.com", &secret).await;

    match result {
        Err(Error::Authentication { ref message }) => assert_eq!(message, "Invalid credentials"),
        other => panic!("expected Authentication error, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_fetch_version_is_anonymous() {
    let (server, client) = setup(TestCredentials::with_tokens("tok", "ref")).await;

    Mock::given(method("GET"))
        .and(path("/version.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "version": "1.4.0",
            "buildTime": "2024-06-15T10:30:00Z"
        })))
        .mount(&server)
        .await;

    let info = client.fetch_version().await.unwrap();

    assert_eq!(info.version, "1.4.0");
    let requests = server.received_requests().await.unwrap();
    assert!(requests[0].headers.get("authorization").is_none());
}
