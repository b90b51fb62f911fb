use super::api_path;
use crate::api_client::{ApiClient, ApiClientError};
use splitter_core::{BalanceSummary, GroupBalance, GroupId, PairBalance, SimplifiedDebt, UserBalance, UserId};

pub struct BalancesApi<'a> {
    client: &'a ApiClient,
}

impl<'a> BalancesApi<'a> {
    pub(crate) fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    pub async fn user_balances(&self) -> Result<Vec<UserBalance>, ApiClientError> {
        self.client
            .get_json(&api_path("/balances/user"), Vec::new())
            .await
    }

    pub async fn group_balances(&self, group_id: GroupId) -> Result<GroupBalance, ApiClientError> {
        let path = api_path(&format!("/balances/group/{}", group_id));
        self.client.get_json(&path, Vec::new()).await
    }

    pub async fn simplified_debts(&self, group_id: GroupId) -> Result<Vec<SimplifiedDebt>, ApiClientError> {
        let path = api_path(&format!("/balances/group/{}/summary", group_id));
        self.client.get_json(&path, Vec::new()).await
    }

    pub async fn summary(&self) -> Result<BalanceSummary, ApiClientError> {
        self.client
            .get_json(&api_path("/balances/summary"), Vec::new())
            .await
    }

    pub async fn between(&self, user_a: UserId, user_b: UserId) -> Result<PairBalance, ApiClientError> {
        let path = api_path(&format!("/balances/between/{}/{}", user_a, user_b));
        self.client.get_json(&path, Vec::new()).await
    }
}
