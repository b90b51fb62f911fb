//! Client facade: cached reads, mutation invalidation, and session lifecycle.

use reqwest::Method;
use serde_json::json;
use splitter_client::api_client::ApiClient;
use splitter_client::cache::QueryCache;
use splitter_client::client::SplitterClient;
use splitter_client::session::{SessionEvent, SessionStore};
use splitter_client::transport::HttpTransport;
use splitter_core::{ExpenseFilters, Resource};
use splitter_test_utils::{
    balance_summary_json, expense_json, group_json, page_json, signed_in_store, token_body,
    ScriptedTransport, LOGIN_ROUTE,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use uuid::Uuid;

const GROUPS: &str = "/api/v1/groups";
const EXPENSES: &str = "/api/v1/expenses";
const SUMMARY: &str = "/api/v1/balances/summary";

fn client(transport: &Arc<ScriptedTransport>, session: SessionStore) -> SplitterClient {
    let dyn_transport: Arc<dyn HttpTransport> = transport.clone();
    let api = ApiClient::with_transport(dyn_transport, session, LOGIN_ROUTE);
    SplitterClient::from_parts(api, QueryCache::new(Duration::from_secs(60)))
}

#[tokio::test]
async fn repeated_reads_are_served_from_cache() {
    let transport = ScriptedTransport::new();
    transport.push(Method::GET, GROUPS, 200, json!([group_json(Uuid::new_v4(), "Flat")]));
    let client = client(&transport, signed_in_store("T1", "R1"));

    let first = client.groups().await.unwrap();
    let second = client.groups().await.unwrap();

    assert_eq!(first, second);
    assert_eq!(transport.requests_to(GROUPS).len(), 1);
}

#[tokio::test]
async fn invalidated_reads_go_back_to_the_server() {
    let transport = ScriptedTransport::new();
    transport
        .push(Method::GET, GROUPS, 200, json!([]))
        .push(Method::GET, GROUPS, 200, json!([group_json(Uuid::new_v4(), "Trip")]));
    let client = client(&transport, signed_in_store("T1", "R1"));

    assert!(client.groups().await.unwrap().is_empty());
    client.cache().invalidate(Resource::Groups);
    assert_eq!(client.groups().await.unwrap().len(), 1);
    assert_eq!(transport.requests_to(GROUPS).len(), 2);
}

#[tokio::test]
async fn expense_mutations_invalidate_expenses_and_balances() {
    let transport = ScriptedTransport::new();
    let group_id = Uuid::new_v4();
    let expense_id = Uuid::new_v4();
    transport
        .push(Method::GET, GROUPS, 200, json!([]))
        .push(Method::GET, SUMMARY, 200, balance_summary_json(10.0, 0.0))
        .push(Method::GET, SUMMARY, 200, balance_summary_json(0.0, 0.0))
        .push(Method::GET, EXPENSES, 200, page_json(vec![]))
        .push(
            Method::GET,
            EXPENSES,
            200,
            page_json(vec![expense_json(expense_id, group_id, "Dinner", 42.0)]),
        )
        .push(Method::DELETE, &format!("{}/{}", EXPENSES, expense_id), 204, json!(null));
    let client = client(&transport, signed_in_store("T1", "R1"));
    let filters = ExpenseFilters::for_group(group_id);

    client.groups().await.unwrap();
    client.balance_summary().await.unwrap();
    assert!(client.expenses(&filters).await.unwrap().content.is_empty());

    client.delete_expense(expense_id).await.unwrap();

    assert_eq!(client.cache().invalidation_count(Resource::Expenses), 1);
    assert_eq!(client.cache().invalidation_count(Resource::Balances), 1);
    assert_eq!(client.cache().invalidation_count(Resource::Groups), 0);

    client.groups().await.unwrap();
    assert_eq!(transport.requests_to(GROUPS).len(), 1);

    let summary = client.balance_summary().await.unwrap();
    assert_eq!(summary.you_owe, 0.0);
    let page = client.expenses(&filters).await.unwrap();
    assert_eq!(page.content[0].description, "Dinner");
    assert_eq!(transport.pending(), 0);
}

#[tokio::test]
async fn failed_mutations_leave_the_cache_alone() {
    let transport = ScriptedTransport::new();
    let expense_id = Uuid::new_v4();
    transport.push(
        Method::DELETE,
        &format!("{}/{}", EXPENSES, expense_id),
        409,
        json!({ "message": "Expense already settled" }),
    );
    let client = client(&transport, signed_in_store("T1", "R1"));

    let err = client.delete_expense(expense_id).await.unwrap_err();

    assert_eq!(err.user_message(), "Expense already settled");
    assert_eq!(client.cache().invalidation_count(Resource::Expenses), 0);
    assert_eq!(client.cache().invalidation_count(Resource::Balances), 0);
}

#[tokio::test]
async fn notification_mutations_invalidate_notifications_only() {
    let transport = ScriptedTransport::new();
    transport.push(Method::POST, "/api/v1/notifications/read-all", 200, json!(null));
    let client = client(&transport, signed_in_store("T1", "R1"));

    client.mark_all_notifications_read().await.unwrap();

    assert_eq!(client.cache().invalidation_count(Resource::Notifications), 1);
    for resource in [Resource::Groups, Resource::Expenses, Resource::Balances, Resource::Settlements] {
        assert_eq!(client.cache().invalidation_count(resource), 0, "{resource}");
    }
}

#[tokio::test]
async fn group_deletion_invalidates_groups() {
    let transport = ScriptedTransport::new();
    let group_id = Uuid::new_v4();
    transport.push(Method::DELETE, &format!("{}/{}", GROUPS, group_id), 204, json!(null));
    let client = client(&transport, signed_in_store("T1", "R1"));

    client.delete_group(group_id).await.unwrap();

    assert_eq!(client.cache().invalidation_count(Resource::Groups), 1);
    assert_eq!(client.cache().invalidation_count(Resource::Balances), 0);
}

#[tokio::test]
async fn login_starts_a_session_and_invalidates_everything() {
    let transport = ScriptedTransport::new();
    transport.push(Method::POST, "/api/v1/auth/login", 200, token_body("T1", "R1"));
    let session = SessionStore::new();
    let mut events = session.events();
    let client = client(&transport, session.clone());

    client.login("ana@example.com", "hunter22").await.unwrap();

    assert_eq!(session.access_token().as_deref(), Some("T1"));
    assert_eq!(events.try_recv().unwrap(), SessionEvent::SignedIn);
    for resource in Resource::ALL {
        assert_eq!(client.cache().invalidation_count(resource), 1, "{resource}");
    }
    let body = transport.requests()[0].body.clone().unwrap();
    assert_eq!(body["email"], "ana@example.com");
}

#[tokio::test]
async fn logout_clears_local_state_even_when_the_server_fails() {
    let transport = ScriptedTransport::new();
    transport
        .push(Method::GET, GROUPS, 200, json!([]))
        .push_failure(Method::POST, "/api/v1/auth/logout", "connection reset");
    let session = signed_in_store("T1", "R1");
    let client = client(&transport, session.clone());
    client.groups().await.unwrap();

    client.logout().await;

    assert!(!session.is_authenticated());
    assert!(client
        .cache()
        .peek::<serde_json::Value>(&splitter_client::cache::QueryKey::new(Resource::Groups))
        .is_none());
    let logout = transport.requests_to("/api/v1/auth/logout").pop().unwrap();
    assert_eq!(logout.body.unwrap()["refreshToken"], "R1");
}

#[tokio::test]
async fn spawned_refreshes_fill_the_cache_and_report_failures() {
    let transport = ScriptedTransport::new();
    transport.push(Method::GET, GROUPS, 200, json!([group_json(Uuid::new_v4(), "Flat")]));
    let client = client(&transport, signed_in_store("T1", "R1"));
    let mut tasks = JoinSet::new();

    client.spawn_refresh(Resource::Groups, &mut tasks);
    client.spawn_refresh(Resource::Expenses, &mut tasks);

    let mut outcomes = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        let (resource, result) = joined.unwrap();
        outcomes.push((resource, result.map_err(|err| err.status())));
    }
    outcomes.sort_by_key(|(resource, _)| resource.to_string());

    assert_eq!(outcomes.len(), 2);
    assert_eq!(outcomes[0].0, Resource::Expenses);
    assert_eq!(outcomes[0].1, Err(Some(reqwest::StatusCode::NOT_FOUND)));
    assert_eq!(outcomes[1], (Resource::Groups, Ok(())));

    assert_eq!(client.groups().await.unwrap().len(), 1);
    assert_eq!(transport.requests_to(GROUPS).len(), 1);
}
