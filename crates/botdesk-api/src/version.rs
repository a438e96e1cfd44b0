// Deployment version probe
//
// `version.json` is served next to the app and read without credentials.

use chrono::Utc;

use crate::client::{ApiClient, ApiRequest, AuthMode};
use crate::error::Error;
use crate::models::VersionInfo;

impl ApiClient {
    /// `GET /version.json`
    ///
    /// A cache-busting `t` parameter keeps intermediaries from serving a
    /// stale manifest.
    pub async fn fetch_version(&self) -> Result<VersionInfo, Error> {
        let req = ApiRequest::get("version.json")
            .query(vec![("t", Utc::now().timestamp_millis().to_string())])
            .auth(AuthMode::Anonymous);
        self.fetch(req).await
    }
}

impl VersionInfo {
    /// Manifest for the running build, as written to `version.json`.
    pub fn current() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_owned(),
            build_time: Some(Utc::now()),
        }
    }
}
