use super::api_path;
use crate::api_client::{ApiClient, ApiClientError};
use splitter_core::{
    Notification, NotificationId, NotificationPreference, PagedResponse, UnreadCount,
    UpdatePreferencesRequest,
};

pub struct NotificationsApi<'a> {
    client: &'a ApiClient,
}

impl<'a> NotificationsApi<'a> {
    pub(crate) fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    pub async fn list(&self, page: u32, size: u32) -> Result<PagedResponse<Notification>, ApiClientError> {
        let query = vec![
            ("page".to_string(), page.to_string()),
            ("size".to_string(), size.to_string()),
        ];
        self.client
            .get_json(&api_path("/notifications"), query)
            .await
    }

    pub async fn unread_count(&self) -> Result<u64, ApiClientError> {
        let count: UnreadCount = self
            .client
            .get_json(&api_path("/notifications/unread/count"), Vec::new())
            .await?;
        Ok(count.count)
    }

    pub async fn mark_read(&self, id: NotificationId) -> Result<(), ApiClientError> {
        let path = api_path(&format!("/notifications/{}/read", id));
        self.client.post_unit::<()>(&path, None).await
    }

    pub async fn mark_all_read(&self) -> Result<(), ApiClientError> {
        self.client
            .post_unit::<()>(&api_path("/notifications/read-all"), None)
            .await
    }

    pub async fn delete(&self, id: NotificationId) -> Result<(), ApiClientError> {
        let path = api_path(&format!("/notifications/{}", id));
        self.client.delete_unit(&path).await
    }

    pub async fn preferences(&self) -> Result<Vec<NotificationPreference>, ApiClientError> {
        self.client
            .get_json(&api_path("/notifications/preferences"), Vec::new())
            .await
    }

    pub async fn update_preferences(&self, req: &UpdatePreferencesRequest) -> Result<(), ApiClientError> {
        self.client
            .put_unit(&api_path("/notifications/preferences"), req)
            .await
    }
}
