//! Settlement (payment between members) types.

use crate::{GroupId, SettlementId, Timestamp, UserId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SettlementStatus {
    Pending,
    Confirmed,
    Rejected,
    Cancelled,
}

impl SettlementStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SettlementStatus::Pending => "PENDING",
            SettlementStatus::Confirmed => "CONFIRMED",
            SettlementStatus::Rejected => "REJECTED",
            SettlementStatus::Cancelled => "CANCELLED",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    Cash,
    BankTransfer,
    Venmo,
    Paypal,
    Zelle,
    CreditCard,
    Check,
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settlement {
    pub id: SettlementId,
    pub from_user_id: UserId,
    pub from_user_name: String,
    pub to_user_id: UserId,
    pub to_user_name: String,
    pub amount: f64,
    pub currency: String,
    pub payment_method: PaymentMethod,
    pub status: SettlementStatus,
    #[serde(default)]
    pub group_id: Option<GroupId>,
    #[serde(default)]
    pub group_name: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSettlementRequest {
    pub from_user_id: UserId,
    pub to_user_id: UserId,
    pub amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    pub payment_method: PaymentMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<GroupId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectSettlementRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct SettlementFilters {
    pub group_id: Option<GroupId>,
    pub status: Option<SettlementStatus>,
    pub page: Option<u32>,
    pub size: Option<u32>,
}

impl SettlementFilters {
    pub fn pending() -> Self {
        Self {
            status: Some(SettlementStatus::Pending),
            ..Default::default()
        }
    }

    pub fn to_query(&self) -> Vec<(String, String)> {
        let mut query = Vec::new();
        if let Some(group_id) = self.group_id {
            query.push(("groupId".to_string(), group_id.to_string()));
        }
        if let Some(status) = self.status {
            query.push(("status".to_string(), status.as_str().to_string()));
        }
        if let Some(page) = self.page {
            query.push(("page".to_string(), page.to_string()));
        }
        if let Some(size) = self.size {
            query.push(("size".to_string(), size.to_string()));
        }
        query
    }
}
