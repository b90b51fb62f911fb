//! Realtime Message Types
//!
//! Frames exchanged on the `/ws` channel are JSON objects of the shape
//! `{"type": "...", "payload": ...}` in both directions. Inbound frames are
//! parsed loosely into [`RealtimeMessage`] and then classified into a
//! [`ServerEvent`], so types the server adds later are ignored rather than
//! rejected.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

// ============================================================================
// CACHE NAMESPACES
// ============================================================================

/// Logical resource a cached query belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resource {
    Groups,
    Expenses,
    Balances,
    Notifications,
    Settlements,
}

impl Resource {
    pub const ALL: [Resource; 5] = [
        Resource::Groups,
        Resource::Expenses,
        Resource::Balances,
        Resource::Notifications,
        Resource::Settlements,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Resource::Groups => "groups",
            Resource::Expenses => "expenses",
            Resource::Balances => "balances",
            Resource::Notifications => "notifications",
            Resource::Settlements => "settlements",
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// INBOUND
// ============================================================================

/// A raw inbound frame. The payload is opaque until classified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RealtimeMessage {
    #[serde(rename = "type")]
    pub message_type: String,
    #[serde(default)]
    pub payload: Value,
}

impl RealtimeMessage {
    /// Parse a text frame. Fails on malformed JSON or a missing `type`.
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    fn payload_str(&self, field: &str) -> Option<String> {
        self.payload
            .get(field)
            .and_then(Value::as_str)
            .map(str::to_string)
    }
}

pub const EXPENSE_CREATED: &str = "EXPENSE_CREATED";
pub const EXPENSE_UPDATED: &str = "EXPENSE_UPDATED";
pub const EXPENSE_DELETED: &str = "EXPENSE_DELETED";
pub const SETTLEMENT_CREATED: &str = "SETTLEMENT_CREATED";
pub const SETTLEMENT_CONFIRMED: &str = "SETTLEMENT_CONFIRMED";
pub const GROUP_UPDATED: &str = "GROUP_UPDATED";
pub const GROUP_MEMBER_JOINED: &str = "GROUP_MEMBER_JOINED";
pub const NOTIFICATION: &str = "NOTIFICATION";
pub const HEARTBEAT: &str = "HEARTBEAT";
pub const HEARTBEAT_ACK: &str = "HEARTBEAT_ACK";

/// Every inbound message type the client acts on.
pub const KNOWN_MESSAGE_TYPES: [&str; 9] = [
    EXPENSE_CREATED,
    EXPENSE_UPDATED,
    EXPENSE_DELETED,
    SETTLEMENT_CREATED,
    SETTLEMENT_CONFIRMED,
    GROUP_UPDATED,
    GROUP_MEMBER_JOINED,
    NOTIFICATION,
    HEARTBEAT,
];

/// Classified inbound event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerEvent {
    ExpenseCreated { description: Option<String> },
    ExpenseUpdated,
    ExpenseDeleted,
    SettlementCreated,
    SettlementConfirmed,
    GroupUpdated,
    GroupMemberJoined { display_name: Option<String> },
    Notification,
    Heartbeat,
    /// A type this client does not know. Carries the raw type name.
    Unknown(String),
}

impl ServerEvent {
    pub fn from_message(message: &RealtimeMessage) -> Self {
        match message.message_type.as_str() {
            EXPENSE_CREATED => ServerEvent::ExpenseCreated {
                description: message.payload_str("description"),
            },
            EXPENSE_UPDATED => ServerEvent::ExpenseUpdated,
            EXPENSE_DELETED => ServerEvent::ExpenseDeleted,
            SETTLEMENT_CREATED => ServerEvent::SettlementCreated,
            SETTLEMENT_CONFIRMED => ServerEvent::SettlementConfirmed,
            GROUP_UPDATED => ServerEvent::GroupUpdated,
            GROUP_MEMBER_JOINED => ServerEvent::GroupMemberJoined {
                display_name: message.payload_str("displayName"),
            },
            NOTIFICATION => ServerEvent::Notification,
            HEARTBEAT => ServerEvent::Heartbeat,
            other => ServerEvent::Unknown(other.to_string()),
        }
    }

    /// Cache namespaces this event makes stale.
    pub fn invalidates(&self) -> &'static [Resource] {
        match self {
            ServerEvent::ExpenseCreated { .. }
            | ServerEvent::ExpenseUpdated
            | ServerEvent::ExpenseDeleted => &[Resource::Expenses, Resource::Balances],
            ServerEvent::SettlementCreated | ServerEvent::SettlementConfirmed => {
                &[Resource::Settlements, Resource::Balances]
            }
            ServerEvent::GroupUpdated | ServerEvent::GroupMemberJoined { .. } => {
                &[Resource::Groups]
            }
            ServerEvent::Notification => &[Resource::Notifications],
            ServerEvent::Heartbeat | ServerEvent::Unknown(_) => &[],
        }
    }

    /// Frame the client must send back in response, if any.
    pub fn reply(&self) -> Option<OutboundMessage> {
        match self {
            ServerEvent::Heartbeat => Some(OutboundMessage::HeartbeatAck),
            _ => None,
        }
    }
}

// ============================================================================
// OUTBOUND
// ============================================================================

/// Frames the client sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutboundMessage {
    HeartbeatAck,
}

impl OutboundMessage {
    pub fn to_json(&self) -> String {
        match self {
            OutboundMessage::HeartbeatAck => format!(r#"{{"type":"{}"}}"#, HEARTBEAT_ACK),
        }
    }
}
