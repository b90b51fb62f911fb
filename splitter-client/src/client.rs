//! High-level client: cached reads and mutations that keep the cache honest.
//!
//! Reads go through [`QueryCache::fetch`]. A successful mutation invalidates
//! the resources it can affect so the next read refetches:
//!
//! | mutation                         | invalidates            |
//! |----------------------------------|------------------------|
//! | expense create/update/delete     | expenses, balances     |
//! | group create/update/delete       | groups                 |
//! | settlement create/confirm/reject/cancel | settlements, balances |
//! | notification read/read-all/delete | notifications         |

use crate::api_client::{ApiClient, ApiClientError};
use crate::cache::{QueryCache, QueryKey};
use crate::config::ClientConfig;
use crate::session::SessionStore;
use tokio::task::JoinSet;
use splitter_core::{
    AuthResponse, BalanceSummary, CreateExpenseRequest, CreateGroupRequest,
    CreateSettlementRequest, Expense, ExpenseFilters, ExpenseId, Group, GroupBalance, GroupId,
    GroupWithMembers, LoginRequest, Notification, NotificationId, PagedResponse,
    RegisterRequest, Resource, Settlement, SettlementFilters, SettlementId, UpdateExpenseRequest,
    UpdateGroupRequest, UserBalance,
};

pub type RefreshOutcome = (Resource, Result<(), ApiClientError>);

#[derive(Debug, Clone)]
pub struct SplitterClient {
    api: ApiClient,
    cache: QueryCache,
    session: SessionStore,
}

impl SplitterClient {
    pub fn new(config: &ClientConfig, session: SessionStore) -> Result<Self, ApiClientError> {
        let api = ApiClient::new(config, session.clone())?;
        Ok(Self::from_parts(api, QueryCache::new(config.cache_ttl())))
    }

    pub fn from_parts(api: ApiClient, cache: QueryCache) -> Self {
        let session = api.session().clone();
        Self {
            api,
            cache,
            session,
        }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    // --- auth ---

    pub async fn login(&self, email: &str, password: &str) -> Result<AuthResponse, ApiClientError> {
        let request = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let response = self.api.auth().login(&request).await?;
        self.start_session(&response);
        Ok(response)
    }

    pub async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse, ApiClientError> {
        let response = self.api.auth().register(request).await?;
        self.start_session(&response);
        Ok(response)
    }

    fn start_session(&self, response: &AuthResponse) {
        self.session.sign_in(response);
        self.cache.invalidate_all();
        tracing::info!(user_id = ?response.user_id, "Signed in");
    }

    /// End the session locally. The server is told first, but a failure there
    /// does not keep the local session alive.
    pub async fn logout(&self) {
        if let Some(refresh_token) = self.session.refresh_token() {
            if let Err(err) = self.api.auth().logout(&refresh_token).await {
                tracing::warn!(error = %err, "Server logout failed, clearing local session anyway");
            }
        }
        self.session.logout();
        self.cache.clear();
        tracing::info!("Signed out");
    }

    // --- groups ---

    pub async fn groups(&self) -> Result<Vec<Group>, ApiClientError> {
        self.cache
            .fetch(QueryKey::new(Resource::Groups), || async move { self.api.groups().list().await })
            .await
    }

    pub async fn group(&self, id: GroupId) -> Result<GroupWithMembers, ApiClientError> {
        self.cache
            .fetch(QueryKey::new(Resource::Groups).with(id), || async move {
                self.api.groups().get(id).await
            })
            .await
    }

    pub async fn create_group(&self, request: &CreateGroupRequest) -> Result<Group, ApiClientError> {
        let group = self.api.groups().create(request).await?;
        self.invalidate(&[Resource::Groups]);
        Ok(group)
    }

    pub async fn update_group(
        &self,
        id: GroupId,
        request: &UpdateGroupRequest,
    ) -> Result<Group, ApiClientError> {
        let group = self.api.groups().update(id, request).await?;
        self.invalidate(&[Resource::Groups]);
        Ok(group)
    }

    pub async fn delete_group(&self, id: GroupId) -> Result<(), ApiClientError> {
        self.api.groups().delete(id).await?;
        self.invalidate(&[Resource::Groups]);
        Ok(())
    }

    // --- expenses ---

    pub async fn expenses(&self, filters: &ExpenseFilters) -> Result<PagedResponse<Expense>, ApiClientError> {
        self.cache
            .fetch(expenses_key(filters), || async move { self.api.expenses().list(filters).await })
            .await
    }

    pub async fn expense(&self, id: ExpenseId) -> Result<Expense, ApiClientError> {
        self.cache
            .fetch(QueryKey::new(Resource::Expenses).with("detail").with(id), || async move {
                self.api.expenses().get(id).await
            })
            .await
    }

    pub async fn create_expense(&self, request: &CreateExpenseRequest) -> Result<Expense, ApiClientError> {
        let expense = self.api.expenses().create(request).await?;
        self.invalidate(&[Resource::Expenses, Resource::Balances]);
        Ok(expense)
    }

    pub async fn update_expense(
        &self,
        id: ExpenseId,
        request: &UpdateExpenseRequest,
    ) -> Result<Expense, ApiClientError> {
        let expense = self.api.expenses().update(id, request).await?;
        self.invalidate(&[Resource::Expenses, Resource::Balances]);
        Ok(expense)
    }

    pub async fn delete_expense(&self, id: ExpenseId) -> Result<(), ApiClientError> {
        self.api.expenses().delete(id).await?;
        self.invalidate(&[Resource::Expenses, Resource::Balances]);
        Ok(())
    }

    // --- balances ---

    pub async fn user_balances(&self) -> Result<Vec<UserBalance>, ApiClientError> {
        self.cache
            .fetch(QueryKey::new(Resource::Balances).with("user"), || async move {
                self.api.balances().user_balances().await
            })
            .await
    }

    pub async fn group_balances(&self, group_id: GroupId) -> Result<GroupBalance, ApiClientError> {
        self.cache
            .fetch(QueryKey::new(Resource::Balances).with("group").with(group_id), || async move {
                self.api.balances().group_balances(group_id).await
            })
            .await
    }

    pub async fn balance_summary(&self) -> Result<BalanceSummary, ApiClientError> {
        self.cache
            .fetch(QueryKey::new(Resource::Balances).with("summary"), || async move {
                self.api.balances().summary().await
            })
            .await
    }

    // --- settlements ---

    pub async fn settlements(
        &self,
        filters: &SettlementFilters,
    ) -> Result<PagedResponse<Settlement>, ApiClientError> {
        let key = QueryKey::new(Resource::Settlements).with(query_scope(&filters.to_query()));
        self.cache
            .fetch(key, || async move { self.api.settlements().list(filters).await })
            .await
    }

    pub async fn create_settlement(
        &self,
        request: &CreateSettlementRequest,
    ) -> Result<Settlement, ApiClientError> {
        let settlement = self.api.settlements().create(request).await?;
        self.invalidate(&[Resource::Settlements, Resource::Balances]);
        Ok(settlement)
    }

    pub async fn confirm_settlement(&self, id: SettlementId) -> Result<Settlement, ApiClientError> {
        let settlement = self.api.settlements().confirm(id).await?;
        self.invalidate(&[Resource::Settlements, Resource::Balances]);
        Ok(settlement)
    }

    pub async fn reject_settlement(
        &self,
        id: SettlementId,
        reason: Option<&str>,
    ) -> Result<Settlement, ApiClientError> {
        let settlement = self.api.settlements().reject(id, reason).await?;
        self.invalidate(&[Resource::Settlements, Resource::Balances]);
        Ok(settlement)
    }

    pub async fn cancel_settlement(&self, id: SettlementId) -> Result<Settlement, ApiClientError> {
        let settlement = self.api.settlements().cancel(id).await?;
        self.invalidate(&[Resource::Settlements, Resource::Balances]);
        Ok(settlement)
    }

    // --- notifications ---

    pub async fn notifications(
        &self,
        page: u32,
        size: u32,
    ) -> Result<PagedResponse<Notification>, ApiClientError> {
        let key = QueryKey::new(Resource::Notifications)
            .with("list")
            .with(page)
            .with(size);
        self.cache
            .fetch(key, || async move { self.api.notifications().list(page, size).await })
            .await
    }

    pub async fn unread_notifications(&self) -> Result<u64, ApiClientError> {
        self.cache
            .fetch(QueryKey::new(Resource::Notifications).with("unread"), || async move {
                self.api.notifications().unread_count().await
            })
            .await
    }

    pub async fn mark_notification_read(&self, id: NotificationId) -> Result<(), ApiClientError> {
        self.api.notifications().mark_read(id).await?;
        self.invalidate(&[Resource::Notifications]);
        Ok(())
    }

    pub async fn mark_all_notifications_read(&self) -> Result<(), ApiClientError> {
        self.api.notifications().mark_all_read().await?;
        self.invalidate(&[Resource::Notifications]);
        Ok(())
    }

    pub async fn delete_notification(&self, id: NotificationId) -> Result<(), ApiClientError> {
        self.api.notifications().delete(id).await?;
        self.invalidate(&[Resource::Notifications]);
        Ok(())
    }

    /// Refetch whatever the cache holds for `resource`. Used after a realtime
    /// invalidation so readers see fresh data without asking.
    pub async fn refresh(&self, resource: Resource) -> Result<(), ApiClientError> {
        match resource {
            Resource::Groups => {
                self.groups().await?;
            }
            Resource::Expenses => {
                self.expenses(&ExpenseFilters::default()).await?;
            }
            Resource::Balances => {
                self.user_balances().await?;
                self.balance_summary().await?;
            }
            Resource::Settlements => {
                self.settlements(&SettlementFilters::default()).await?;
            }
            Resource::Notifications => {
                self.unread_notifications().await?;
            }
        }
        Ok(())
    }

    /// [`refresh`](Self::refresh) on a task in `tasks`, so the caller's
    /// event loop keeps running while the request is in flight.
    pub fn spawn_refresh(&self, resource: Resource, tasks: &mut JoinSet<RefreshOutcome>) {
        let client = self.clone();
        tasks.spawn(async move { (resource, client.refresh(resource).await) });
    }

    fn invalidate(&self, resources: &[Resource]) {
        for resource in resources {
            self.cache.invalidate(*resource);
        }
    }
}

/// Expenses are scoped by group first so one group's list can be dropped
/// without touching the others.
fn expenses_key(filters: &ExpenseFilters) -> QueryKey {
    let group = filters
        .group_id
        .map(|id| id.to_string())
        .unwrap_or_else(|| "all".to_string());
    QueryKey::new(Resource::Expenses)
        .with(group)
        .with(query_scope(&filters.to_query()))
}

fn query_scope(query: &[(String, String)]) -> String {
    query
        .iter()
        .map(|(key, value)| format!("{}={}", key, value))
        .collect::<Vec<_>>()
        .join("&")
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn expense_keys_sit_under_their_group() {
        let group = Uuid::new_v4();
        let mut filters = ExpenseFilters::for_group(group);
        filters.page = Some(2);
        let key = expenses_key(&filters);
        assert!(key.starts_with(&QueryKey::new(Resource::Expenses).with(group)));
        assert_eq!(key.scope[1], format!("groupId={}&page=2", group));
    }

    #[test]
    fn unscoped_expense_key_uses_all() {
        let key = expenses_key(&ExpenseFilters::default());
        assert_eq!(key.to_string(), "expenses/all/");
    }
}
