//! Realtime sync channel against an in-memory socket, with paused time.

use serde_json::json;
use splitter_client::cache::QueryCache;
use splitter_client::config::ClientConfig;
use splitter_client::events::SyncEvent;
use splitter_client::realtime::{ConnectionState, SyncChannel, SyncHandle};
use splitter_client::session::SessionStore;
use splitter_client::socket::SocketConnector;
use splitter_core::realtime::{EXPENSE_CREATED, HEARTBEAT, NOTIFICATION, SETTLEMENT_CREATED};
use splitter_core::Resource;
use splitter_test_utils::{
    auth_response, signed_in_store, ClientFrame, ConnectPlan, FakeConnector, FakePeer,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};

const RECONNECT_DELAY: Duration = Duration::from_secs(5);

struct Harness {
    connector: Arc<FakeConnector>,
    peers: mpsc::UnboundedReceiver<FakePeer>,
    events: mpsc::Receiver<SyncEvent>,
    cache: QueryCache,
    session: SessionStore,
    handle: SyncHandle,
    state: watch::Receiver<ConnectionState>,
}

impl Harness {
    fn start(session: SessionStore) -> Self {
        Self::start_with(session, |_| {})
    }

    fn start_with(session: SessionStore, script: impl FnOnce(&FakeConnector)) -> Self {
        let (connector, peers) = FakeConnector::new();
        script(&connector);
        let cache = QueryCache::new(Duration::from_secs(60));
        let (event_tx, events) = mpsc::channel(64);
        let config = ClientConfig::default();
        let dyn_connector: Arc<dyn SocketConnector> = connector.clone();
        let handle = SyncChannel::new(dyn_connector, session.clone(), cache.clone(), event_tx, &config)
            .spawn();
        let state = handle.state_changes();
        Self {
            connector,
            peers,
            events,
            cache,
            session,
            handle,
            state,
        }
    }

    async fn next_peer(&mut self) -> FakePeer {
        self.peers.recv().await.expect("connector dropped")
    }

    async fn connected(&mut self) -> FakePeer {
        let peer = self.next_peer().await;
        self.wait_for(ConnectionState::Connected).await;
        loop {
            match self.events.recv().await {
                Some(SyncEvent::Connected) => return peer,
                Some(SyncEvent::Disconnected { .. }) => continue,
                other => panic!("expected a connection event, got {other:?}"),
            }
        }
    }

    async fn wait_for(&mut self, wanted: ConnectionState) {
        self.state
            .wait_for(|state| *state == wanted)
            .await
            .expect("sync task dropped its state");
    }

    /// Next event that is not a connection notice.
    async fn next_data_event(&mut self) -> SyncEvent {
        loop {
            match self.events.recv().await.expect("event channel closed") {
                SyncEvent::Connected | SyncEvent::Disconnected { .. } => continue,
                event => return event,
            }
        }
    }

    fn invalidations(&self) -> Vec<(Resource, u64)> {
        Resource::ALL
            .iter()
            .map(|resource| (*resource, self.cache.invalidation_count(*resource)))
            .filter(|(_, count)| *count > 0)
            .collect()
    }
}

fn assert_fixed_delay(gap: Duration) {
    assert!(
        gap >= RECONNECT_DELAY && gap < RECONNECT_DELAY + Duration::from_millis(10),
        "reconnect gap was {gap:?}"
    );
}

#[tokio::test(start_paused = true)]
async fn connects_with_the_access_token_in_the_url() {
    let mut harness = Harness::start(signed_in_store("T1", "R1"));

    let peer = harness.connected().await;

    assert_eq!(peer.url, "ws://localhost:8080/ws?token=T1");
    assert_eq!(peer.token(), Some("T1"));
    assert_eq!(harness.handle.state(), ConnectionState::Connected);
    harness.handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn expense_created_invalidates_and_notifies() {
    let mut harness = Harness::start(signed_in_store("T1", "R1"));
    let peer = harness.connected().await;

    peer.send_event(EXPENSE_CREATED, json!({ "description": "Lunch" }));

    assert_eq!(
        harness.next_data_event().await,
        SyncEvent::Invalidated(vec![Resource::Expenses, Resource::Balances])
    );
    match harness.next_data_event().await {
        SyncEvent::Notice(notice) => assert_eq!(notice.text(), "New expense added: Lunch"),
        other => panic!("expected a notice, got {other:?}"),
    }
    assert_eq!(
        harness.invalidations(),
        vec![(Resource::Expenses, 1), (Resource::Balances, 1)]
    );
    harness.handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn heartbeat_is_acknowledged_once_without_invalidation() {
    let mut harness = Harness::start(signed_in_store("T1", "R1"));
    let mut peer = harness.connected().await;

    peer.send_event(HEARTBEAT, json!({}));
    assert_eq!(
        peer.recv().await,
        Some(ClientFrame::Text(r#"{"type":"HEARTBEAT_ACK"}"#.to_string()))
    );

    // A later message proves the heartbeat has been fully handled.
    peer.send_event(NOTIFICATION, json!({ "title": "Reminder" }));
    assert_eq!(
        harness.next_data_event().await,
        SyncEvent::Invalidated(vec![Resource::Notifications])
    );
    assert_eq!(peer.try_recv(), None);
    assert_eq!(harness.invalidations(), vec![(Resource::Notifications, 1)]);
    harness.handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn malformed_and_unknown_frames_leave_the_socket_open() {
    let mut harness = Harness::start(signed_in_store("T1", "R1"));
    let mut peer = harness.connected().await;

    peer.send_text("not json");
    peer.send_text(r#"{"payload":{"description":"no type"}}"#);
    peer.send_text(r#"{"type":42}"#);
    peer.send_event("TYPING_STARTED", json!({}));
    peer.send_event(HEARTBEAT, json!(null));

    assert_eq!(
        peer.recv().await,
        Some(ClientFrame::Text(r#"{"type":"HEARTBEAT_ACK"}"#.to_string()))
    );
    assert!(harness.invalidations().is_empty());
    assert_eq!(harness.handle.state(), ConnectionState::Connected);
    assert_eq!(harness.connector.attempt_count(), 1);
    harness.handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn settlement_created_notice_describes_the_payment() {
    let mut harness = Harness::start(signed_in_store("T1", "R1"));
    let peer = harness.connected().await;

    peer.send_event(SETTLEMENT_CREATED, json!({ "amount": 12.5 }));

    assert_eq!(
        harness.next_data_event().await,
        SyncEvent::Invalidated(vec![Resource::Settlements, Resource::Balances])
    );
    match harness.next_data_event().await {
        SyncEvent::Notice(notice) => {
            assert_eq!(notice.text(), "Settlement recorded: A payment has been recorded")
        }
        other => panic!("expected a notice, got {other:?}"),
    }
    harness.handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn closed_socket_reconnects_after_the_fixed_delay() {
    let mut harness = Harness::start(signed_in_store("T1", "R1"));

    for _ in 0..3 {
        let peer = harness.connected().await;
        peer.send_close();
        harness.wait_for(ConnectionState::Disconnected).await;
    }
    let _peer = harness.next_peer().await;

    let attempts = harness.connector.attempts();
    assert_eq!(attempts.len(), 4);
    for pair in attempts.windows(2) {
        assert_fixed_delay(pair[1].at - pair[0].at);
    }
    harness.handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn refused_connections_keep_retrying_without_backoff() {
    let mut harness = Harness::start_with(signed_in_store("T1", "R1"), |connector| {
        connector
            .plan(ConnectPlan::Refuse("connection refused".to_string()))
            .plan(ConnectPlan::Refuse("connection refused".to_string()))
            .plan(ConnectPlan::Refuse("connection refused".to_string()));
    });

    let _peer = harness.connected().await;

    let attempts = harness.connector.attempts();
    assert_eq!(attempts.len(), 4);
    for pair in attempts.windows(2) {
        assert_fixed_delay(pair[1].at - pair[0].at);
    }
    harness.handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn stream_errors_and_dropped_peers_count_as_closes() {
    let mut harness = Harness::start(signed_in_store("T1", "R1"));

    let peer = harness.connected().await;
    peer.send_error();
    harness.wait_for(ConnectionState::Disconnected).await;

    let peer = harness.connected().await;
    drop(peer);
    harness.wait_for(ConnectionState::Disconnected).await;

    let _peer = harness.next_peer().await;
    assert_eq!(harness.connector.attempt_count(), 3);
    harness.handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn reconnect_request_skips_the_remaining_delay() {
    let mut harness = Harness::start(signed_in_store("T1", "R1"));
    let peer = harness.connected().await;
    peer.send_close();
    harness.wait_for(ConnectionState::Disconnected).await;

    harness.handle.reconnect();
    let _peer = harness.next_peer().await;

    let attempts = harness.connector.attempts();
    assert_eq!(attempts.len(), 2);
    assert!(attempts[1].at - attempts[0].at < RECONNECT_DELAY);
    harness.handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn reconnect_request_while_connected_does_not_shorten_a_later_delay() {
    let mut harness = Harness::start(signed_in_store("T1", "R1"));
    let peer = harness.connected().await;

    harness.handle.reconnect();
    tokio::time::sleep(Duration::from_secs(60)).await;
    let closed_at = tokio::time::Instant::now();
    peer.send_close();
    let _peer = harness.next_peer().await;

    let attempts = harness.connector.attempts();
    assert_eq!(attempts.len(), 2);
    assert_fixed_delay(attempts[1].at - closed_at);
    harness.handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn shutdown_cancels_a_pending_reconnect() {
    let mut harness = Harness::start(signed_in_store("T1", "R1"));
    let peer = harness.connected().await;
    peer.send_close();
    harness.wait_for(ConnectionState::Disconnected).await;

    let mut state = harness.handle.state_changes();
    harness.handle.shutdown().await;
    assert_eq!(*state.borrow_and_update(), ConnectionState::Stopped);

    tokio::time::sleep(RECONNECT_DELAY * 4).await;
    assert_eq!(harness.connector.attempt_count(), 1);
    assert!(harness.peers.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn shutdown_closes_an_open_socket() {
    let mut harness = Harness::start(signed_in_store("T1", "R1"));
    let mut peer = harness.connected().await;

    harness.handle.shutdown().await;

    assert_eq!(peer.recv().await, Some(ClientFrame::Close));
    assert_eq!(*harness.state.borrow(), ConnectionState::Stopped);
}

#[tokio::test(start_paused = true)]
async fn dropping_the_handle_stops_the_channel() {
    let Harness {
        connector,
        mut peers,
        handle,
        mut state,
        ..
    } = Harness::start(signed_in_store("T1", "R1"));
    let mut peer = peers.recv().await.unwrap();

    drop(handle);

    assert_eq!(peer.recv().await, Some(ClientFrame::Close));
    state
        .wait_for(|state| *state == ConnectionState::Stopped)
        .await
        .unwrap();
    tokio::time::sleep(RECONNECT_DELAY * 2).await;
    assert_eq!(connector.attempt_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn waits_for_a_session_before_connecting() {
    let mut harness = Harness::start(SessionStore::new());

    tokio::time::sleep(RECONNECT_DELAY * 3).await;
    assert_eq!(harness.connector.attempt_count(), 0);
    assert_eq!(harness.handle.state(), ConnectionState::Disconnected);

    harness.session.sign_in(&auth_response("T1", "R1"));
    let peer = harness.connected().await;
    assert_eq!(peer.token(), Some("T1"));
    harness.handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn logout_closes_the_socket_and_stays_idle() {
    let mut harness = Harness::start(signed_in_store("T1", "R1"));
    let mut peer = harness.connected().await;

    harness.session.logout();

    assert_eq!(peer.recv().await, Some(ClientFrame::Close));
    harness.wait_for(ConnectionState::Disconnected).await;
    tokio::time::sleep(RECONNECT_DELAY * 3).await;
    assert_eq!(harness.connector.attempt_count(), 1);

    harness.session.sign_in(&auth_response("T9", "R9"));
    let peer = harness.connected().await;
    assert_eq!(peer.token(), Some("T9"));
    harness.handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn rotated_token_reconnects_immediately_with_the_new_token() {
    let mut harness = Harness::start(signed_in_store("T1", "R1"));
    let mut peer = harness.connected().await;
    let opened_at = tokio::time::Instant::now();

    harness.session.set_tokens(&auth_response("T2", "R2"));

    assert_eq!(peer.recv().await, Some(ClientFrame::Close));
    let next = harness.next_peer().await;
    assert_eq!(next.token(), Some("T2"));
    assert!(tokio::time::Instant::now() - opened_at < RECONNECT_DELAY);
    harness.handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn slow_consumers_do_not_stall_the_channel() {
    let (connector, mut peers) = FakeConnector::new();
    let cache = QueryCache::new(Duration::from_secs(60));
    let (event_tx, _events) = mpsc::channel(1);
    let dyn_connector: Arc<dyn SocketConnector> = connector.clone();
    let handle = SyncChannel::new(
        dyn_connector,
        signed_in_store("T1", "R1"),
        cache.clone(),
        event_tx,
        &ClientConfig::default(),
    )
    .spawn();
    let mut peer = peers.recv().await.unwrap();

    for _ in 0..10 {
        peer.send_event(EXPENSE_CREATED, json!({ "description": "Taxi" }));
    }
    peer.send_event(HEARTBEAT, json!({}));

    assert_eq!(
        peer.recv().await,
        Some(ClientFrame::Text(r#"{"type":"HEARTBEAT_ACK"}"#.to_string()))
    );
    assert_eq!(cache.invalidation_count(Resource::Expenses), 10);
    handle.shutdown().await;
}
