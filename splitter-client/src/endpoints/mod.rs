//! Typed wrappers for the `/api/v1` REST endpoints.
//!
//! Each wrapper borrows an [`ApiClient`](crate::api_client::ApiClient), so
//! every call goes through the authenticated request path.

mod auth;
mod balances;
mod expenses;
mod groups;
mod notifications;
mod settlements;

pub use auth::AuthApi;
pub use balances::BalancesApi;
pub use expenses::ExpensesApi;
pub use groups::GroupsApi;
pub use notifications::NotificationsApi;
pub use settlements::SettlementsApi;

pub(crate) const API_PREFIX: &str = "/api/v1";

pub(crate) fn api_path(suffix: &str) -> String {
    format!("{}{}", API_PREFIX, suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_are_prefixed() {
        assert_eq!(api_path("/groups"), "/api/v1/groups");
    }
}
