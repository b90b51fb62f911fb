//! Balance views. Every figure here is computed by the server.

use crate::{GroupId, UserId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Balance {
    pub user_id: UserId,
    pub display_name: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
    pub amount: f64,
    pub currency: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupBalance {
    pub group_id: GroupId,
    pub group_name: String,
    pub balances: Vec<Balance>,
    pub total_owed: f64,
    pub total_owing: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupBalanceEntry {
    pub group_id: GroupId,
    pub group_name: String,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserBalance {
    pub user_id: UserId,
    pub display_name: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
    pub net_balance: f64,
    pub currency: String,
    #[serde(default)]
    pub group_balances: Vec<GroupBalanceEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimplifiedDebt {
    pub from_user_id: UserId,
    pub from_user_name: String,
    pub to_user_id: UserId,
    pub to_user_name: String,
    pub amount: f64,
    pub currency: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceSummary {
    pub you_owe: f64,
    pub you_are_owed: f64,
    pub net_balance: f64,
    pub currency: String,
    #[serde(default)]
    pub debts: Vec<SimplifiedDebt>,
}

/// Net amount between two users.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PairBalance {
    pub amount: f64,
    pub currency: String,
}
