//! Splitter Core - Wire Types
//!
//! Data structures exchanged with the Splitter backend over REST and the
//! realtime WebSocket channel. This crate contains ONLY data types - no I/O.
//! All authority over these values lives on the server; the client holds
//! transient copies.

pub mod auth;
pub mod balance;
pub mod error;
pub mod expense;
pub mod group;
pub mod notification;
pub mod page;
pub mod realtime;
pub mod settlement;

use chrono::{DateTime, Utc};
use uuid::Uuid;

// ============================================================================
// IDENTITY TYPES
// ============================================================================

/// Server-assigned user identifier.
pub type UserId = Uuid;

/// Server-assigned group identifier.
pub type GroupId = Uuid;

/// Server-assigned expense identifier.
pub type ExpenseId = Uuid;

/// Server-assigned settlement identifier.
pub type SettlementId = Uuid;

/// Server-assigned notification identifier.
pub type NotificationId = Uuid;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

pub use auth::{
    AuthResponse, LoginRequest, RefreshTokenRequest, RegisterRequest, TokenValidation,
    UserProfile,
};
pub use balance::{
    Balance, BalanceSummary, GroupBalance, GroupBalanceEntry, PairBalance, SimplifiedDebt,
    UserBalance,
};
pub use error::ErrorBody;
pub use expense::{
    CreateExpenseRequest, Expense, ExpenseCategory, ExpenseFilters, ExpenseShare,
    ParticipantShare, SplitType, UpdateExpenseRequest,
};
pub use group::{
    AddMemberRequest, CreateGroupRequest, CreateInvitationRequest, Group, GroupInvitation,
    GroupMember, GroupType, GroupWithMembers, InvitationStatus, MemberRole, UpdateGroupRequest,
    UpdateMemberRoleRequest,
};
pub use notification::{
    Notification, NotificationChannel, NotificationPreference, NotificationType,
    PreferenceUpdate, UnreadCount, UpdatePreferencesRequest,
};
pub use page::PagedResponse;
pub use realtime::{OutboundMessage, RealtimeMessage, Resource, ServerEvent};
pub use settlement::{
    CreateSettlementRequest, PaymentMethod, RejectSettlementRequest, Settlement,
    SettlementFilters, SettlementStatus,
};
