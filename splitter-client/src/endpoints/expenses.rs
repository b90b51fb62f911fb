use super::api_path;
use crate::api_client::{ApiClient, ApiClientError};
use splitter_core::{
    CreateExpenseRequest, Expense, ExpenseFilters, ExpenseId, GroupId, PagedResponse,
    UpdateExpenseRequest,
};

pub struct ExpensesApi<'a> {
    client: &'a ApiClient,
}

impl<'a> ExpensesApi<'a> {
    pub(crate) fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    pub async fn list(&self, filters: &ExpenseFilters) -> Result<PagedResponse<Expense>, ApiClientError> {
        self.client
            .get_json(&api_path("/expenses"), filters.to_query())
            .await
    }

    pub async fn list_by_group(
        &self,
        group_id: GroupId,
        page: u32,
        size: u32,
    ) -> Result<PagedResponse<Expense>, ApiClientError> {
        let filters = ExpenseFilters {
            group_id: Some(group_id),
            page: Some(page),
            size: Some(size),
            ..Default::default()
        };
        self.list(&filters).await
    }

    pub async fn get(&self, id: ExpenseId) -> Result<Expense, ApiClientError> {
        let path = api_path(&format!("/expenses/{}", id));
        self.client.get_json(&path, Vec::new()).await
    }

    pub async fn create(&self, req: &CreateExpenseRequest) -> Result<Expense, ApiClientError> {
        self.client.post_json(&api_path("/expenses"), req).await
    }

    pub async fn update(&self, id: ExpenseId, req: &UpdateExpenseRequest) -> Result<Expense, ApiClientError> {
        let path = api_path(&format!("/expenses/{}", id));
        self.client.put_json(&path, req).await
    }

    pub async fn delete(&self, id: ExpenseId) -> Result<(), ApiClientError> {
        let path = api_path(&format!("/expenses/{}", id));
        self.client.delete_unit(&path).await
    }

    /// Most recently created expenses across all groups.
    pub async fn recent(&self, limit: u32) -> Result<Vec<Expense>, ApiClientError> {
        let query = vec![
            ("size".to_string(), limit.to_string()),
            ("sort".to_string(), "createdAt,desc".to_string()),
        ];
        let page: PagedResponse<Expense> = self.client.get_json(&api_path("/expenses"), query).await?;
        Ok(page.into_content())
    }
}
