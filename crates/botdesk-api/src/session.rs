// Session endpoints
//
// Login, registration, current-user lookup and token refresh. None of
// these go through the refresh cycle: a 401 here means the credentials
// themselves were rejected.

use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use tracing::debug;

use crate::auth::TokenPair;
use crate::client::{ApiClient, ApiRequest, AuthMode};
use crate::error::Error;
use crate::models::{AuthResponse, AuthUser, RegisterRequest, TokenResponse};

impl ApiClient {
    /// Authenticate with email and password.
    ///
    /// `POST /api/login`
    pub async fn login(&self, email: &str, password: &SecretString) -> Result<AuthResponse, Error> {
        debug!(email, "logging in");
        let req = ApiRequest::post("api/login")
            .json(&json!({
                "email": email,
                "password": password.expose_secret(),
            }))?
            .auth(AuthMode::Anonymous);
        self.fetch(req).await
    }

    /// Create an account and sign in.
    ///
    /// `POST /api/register`
    pub async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse, Error> {
        debug!(email = %request.email, "registering account");
        let req = ApiRequest::post("api/register")
            .json(request)?
            .auth(AuthMode::Anonymous);
        self.fetch(req).await
    }

    /// The user the current token belongs to.
    ///
    /// `GET /api/me`. A rejected token surfaces as
    /// [`Error::Authentication`] without attempting a refresh.
    pub async fn me(&self) -> Result<AuthUser, Error> {
        let req = ApiRequest::get("api/me").auth(AuthMode::Bearer);
        self.fetch(req).await
    }

    /// Exchange a refresh token for a new access token.
    ///
    /// `POST /api/token`
    pub async fn request_token(&self, refresh_token: Option<&SecretString>) -> Result<TokenPair, Error> {
        debug!("requesting new access token");
        let body = match refresh_token {
            Some(token) => json!({ "refreshToken": token.expose_secret() }),
            None => json!({}),
        };
        let req = ApiRequest::post("api/token")
            .json(&body)?
            .auth(AuthMode::Anonymous);
        let resp: TokenResponse = self.fetch_direct(req).await?;
        Ok(resp.into())
    }
}
