use super::api_path;
use crate::api_client::{ApiClient, ApiClientError};
use splitter_core::{
    CreateSettlementRequest, PagedResponse, RejectSettlementRequest, Settlement,
    SettlementFilters, SettlementId,
};

pub struct SettlementsApi<'a> {
    client: &'a ApiClient,
}

impl<'a> SettlementsApi<'a> {
    pub(crate) fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    pub async fn list(&self, filters: &SettlementFilters) -> Result<PagedResponse<Settlement>, ApiClientError> {
        self.client
            .get_json(&api_path("/settlements"), filters.to_query())
            .await
    }

    pub async fn get(&self, id: SettlementId) -> Result<Settlement, ApiClientError> {
        let path = api_path(&format!("/settlements/{}", id));
        self.client.get_json(&path, Vec::new()).await
    }

    pub async fn create(&self, req: &CreateSettlementRequest) -> Result<Settlement, ApiClientError> {
        self.client.post_json(&api_path("/settlements"), req).await
    }

    pub async fn confirm(&self, id: SettlementId) -> Result<Settlement, ApiClientError> {
        let path = api_path(&format!("/settlements/{}/confirm", id));
        self.client.post_empty(&path).await
    }

    pub async fn reject(&self, id: SettlementId, reason: Option<&str>) -> Result<Settlement, ApiClientError> {
        let path = api_path(&format!("/settlements/{}/reject", id));
        let body = RejectSettlementRequest {
            reason: reason.map(str::to_string),
        };
        self.client.post_json(&path, &body).await
    }

    pub async fn cancel(&self, id: SettlementId) -> Result<Settlement, ApiClientError> {
        let path = api_path(&format!("/settlements/{}/cancel", id));
        self.client.post_empty(&path).await
    }

    pub async fn pending(&self) -> Result<Vec<Settlement>, ApiClientError> {
        let page = self.list(&SettlementFilters::pending()).await?;
        Ok(page.into_content())
    }
}
