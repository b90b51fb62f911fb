//! Property-Based Tests for Realtime Cache Invalidation
//!
//! For any sequence of recognized server messages, each message invalidates
//! exactly the resources its type maps to, once, and every HEARTBEAT is
//! answered by exactly one HEARTBEAT_ACK.

use proptest::prelude::*;
use serde_json::json;
use splitter_client::cache::QueryCache;
use splitter_client::config::ClientConfig;
use splitter_client::realtime::SyncChannel;
use splitter_client::socket::SocketConnector;
use splitter_core::Resource;
use splitter_test_utils::generators::arb_known_message_type;
use splitter_test_utils::{signed_in_store, ClientFrame, FakeConnector};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Invalidation table for the realtime protocol.
fn expected_resources(message_type: &str) -> &'static [Resource] {
    match message_type {
        "EXPENSE_CREATED" | "EXPENSE_UPDATED" | "EXPENSE_DELETED" => {
            &[Resource::Expenses, Resource::Balances]
        }
        "SETTLEMENT_CREATED" | "SETTLEMENT_CONFIRMED" => &[Resource::Settlements, Resource::Balances],
        "GROUP_UPDATED" | "GROUP_MEMBER_JOINED" => &[Resource::Groups],
        "NOTIFICATION" => &[Resource::Notifications],
        _ => &[],
    }
}

struct Observed {
    invalidations: BTreeMap<Resource, u64>,
    acks: usize,
    extra_frames: usize,
}

fn replay(message_types: &[&'static str]) -> Observed {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .start_paused(true)
        .build()
        .expect("runtime");

    runtime.block_on(async {
        let (connector, mut peers) = FakeConnector::new();
        let cache = QueryCache::new(Duration::from_secs(60));
        let (event_tx, _events) = mpsc::channel(1024);
        let dyn_connector: Arc<dyn SocketConnector> = connector.clone();
        let handle = SyncChannel::new(
            dyn_connector,
            signed_in_store("T1", "R1"),
            cache.clone(),
            event_tx,
            &ClientConfig::default(),
        )
        .spawn();
        let mut peer = peers.recv().await.expect("peer");

        for message_type in message_types {
            peer.send_event(message_type, json!({ "description": "x", "displayName": "y" }));
        }
        // Trailing heartbeat marks the end of the sequence.
        peer.send_event("HEARTBEAT", json!({}));

        let heartbeats = message_types.iter().filter(|t| **t == "HEARTBEAT").count() + 1;
        let mut acks = 0;
        for _ in 0..heartbeats {
            if let Some(ClientFrame::Text(text)) = peer.recv().await {
                if text == r#"{"type":"HEARTBEAT_ACK"}"# {
                    acks += 1;
                }
            }
        }
        let mut extra_frames = 0;
        while peer.try_recv().is_some() {
            extra_frames += 1;
        }

        let invalidations = Resource::ALL
            .iter()
            .map(|resource| (*resource, cache.invalidation_count(*resource)))
            .collect();
        handle.shutdown().await;
        Observed {
            invalidations,
            acks,
            extra_frames,
        }
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_messages_invalidate_exactly_their_resources(
        message_types in prop::collection::vec(arb_known_message_type(), 0..16)
    ) {
        let observed = replay(&message_types);

        let mut expected: BTreeMap<Resource, u64> =
            Resource::ALL.iter().map(|resource| (*resource, 0)).collect();
        for message_type in &message_types {
            for resource in expected_resources(message_type) {
                *expected.entry(*resource).or_insert(0) += 1;
            }
        }

        prop_assert_eq!(observed.invalidations, expected);
        let heartbeats = message_types.iter().filter(|t| **t == "HEARTBEAT").count() + 1;
        prop_assert_eq!(observed.acks, heartbeats);
        prop_assert_eq!(observed.extra_frames, 0);
    }
}
