// Bot endpoints
//
// Thin REST mapping for `/api/v1/bots`: URL and parameter shaping only.

use serde_json::json;
use tracing::debug;

use crate::client::{ApiClient, ApiRequest};
use crate::error::Error;
use crate::models::{Bot, BulkDeleteResult, CreateBot, EntityId, ListParams, Page, UpdateBot};

const BOTS: &str = "api/v1/bots";

impl ApiClient {
    /// `GET /api/v1/bots?page&pageSize&search&sortBy&sortOrder`
    pub async fn list_bots(&self, params: &ListParams) -> Result<Page<Bot>, Error> {
        debug!(page = params.page, page_size = params.page_size, "listing bots");
        self.fetch(ApiRequest::get(BOTS).query(params.to_query()))
            .await
    }

    /// `GET /api/v1/bots/:id`
    pub async fn get_bot(&self, id: &EntityId) -> Result<Bot, Error> {
        self.fetch(ApiRequest::get(format!("{BOTS}/{id}"))).await
    }

    /// `POST /api/v1/bots`
    pub async fn create_bot(&self, bot: &CreateBot) -> Result<Bot, Error> {
        debug!(name = %bot.name, "creating bot");
        self.fetch(ApiRequest::post(BOTS).json(bot)?).await
    }

    /// `PUT /api/v1/bots/:id`
    pub async fn update_bot(&self, id: &EntityId, update: &UpdateBot) -> Result<Bot, Error> {
        debug!(%id, "updating bot");
        self.fetch(ApiRequest::put(format!("{BOTS}/{id}")).json(update)?)
            .await
    }

    /// `DELETE /api/v1/bots/:id`
    pub async fn delete_bot(&self, id: &EntityId) -> Result<(), Error> {
        debug!(%id, "deleting bot");
        self.fetch_empty(ApiRequest::delete(format!("{BOTS}/{id}")))
            .await
    }

    /// `DELETE /api/v1/bots/bulk` with `{"ids": [...]}`
    pub async fn bulk_delete_bots(&self, ids: &[EntityId]) -> Result<BulkDeleteResult, Error> {
        debug!(count = ids.len(), "bulk deleting bots");
        self.fetch(ApiRequest::delete(format!("{BOTS}/bulk")).json(&json!({ "ids": ids }))?)
            .await
    }
}
