//! Expense types and list filters.

use crate::{ExpenseId, GroupId, Timestamp, UserId};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SplitType {
    Equal,
    Exact,
    Percentage,
    Shares,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExpenseCategory {
    FoodAndDrink,
    Groceries,
    Shopping,
    Entertainment,
    Transportation,
    Utilities,
    Rent,
    Healthcare,
    Education,
    Travel,
    Sports,
    Gifts,
    Other,
}

impl ExpenseCategory {
    /// Wire name, used in query strings.
    pub fn as_str(&self) -> &'static str {
        match self {
            ExpenseCategory::FoodAndDrink => "FOOD_AND_DRINK",
            ExpenseCategory::Groceries => "GROCERIES",
            ExpenseCategory::Shopping => "SHOPPING",
            ExpenseCategory::Entertainment => "ENTERTAINMENT",
            ExpenseCategory::Transportation => "TRANSPORTATION",
            ExpenseCategory::Utilities => "UTILITIES",
            ExpenseCategory::Rent => "RENT",
            ExpenseCategory::Healthcare => "HEALTHCARE",
            ExpenseCategory::Education => "EDUCATION",
            ExpenseCategory::Travel => "TRAVEL",
            ExpenseCategory::Sports => "SPORTS",
            ExpenseCategory::Gifts => "GIFTS",
            ExpenseCategory::Other => "OTHER",
        }
    }

    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            ExpenseCategory::FoodAndDrink => "Food & Drink",
            ExpenseCategory::Groceries => "Groceries",
            ExpenseCategory::Shopping => "Shopping",
            ExpenseCategory::Entertainment => "Entertainment",
            ExpenseCategory::Transportation => "Transportation",
            ExpenseCategory::Utilities => "Utilities",
            ExpenseCategory::Rent => "Rent",
            ExpenseCategory::Healthcare => "Healthcare",
            ExpenseCategory::Education => "Education",
            ExpenseCategory::Travel => "Travel",
            ExpenseCategory::Sports => "Sports",
            ExpenseCategory::Gifts => "Gifts",
            ExpenseCategory::Other => "Other",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseShare {
    pub user_id: UserId,
    pub display_name: String,
    pub share_amount: f64,
    #[serde(default)]
    pub share_percentage: Option<f64>,
    #[serde(default)]
    pub share_units: Option<u32>,
    pub is_paid: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    pub id: ExpenseId,
    #[serde(default)]
    pub group_id: Option<GroupId>,
    #[serde(default)]
    pub group_name: Option<String>,
    pub description: String,
    pub amount: f64,
    pub currency: String,
    pub category: ExpenseCategory,
    pub paid_by: UserId,
    pub paid_by_name: String,
    pub split_type: SplitType,
    pub shares: Vec<ExpenseShare>,
    pub expense_date: NaiveDate,
    #[serde(default)]
    pub receipt_url: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    pub created_by: UserId,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantShare {
    pub user_id: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percentage: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shares: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateExpenseRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<GroupId>,
    pub description: String,
    pub amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    pub category: ExpenseCategory,
    pub paid_by: UserId,
    pub split_type: SplitType,
    pub participants: Vec<ParticipantShare>,
    pub expense_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateExpenseRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<ExpenseCategory>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paid_by: Option<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub split_type: Option<SplitType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub participants: Option<Vec<ParticipantShare>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expense_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Filters for `GET /expenses`. Unset fields are left out of the query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ExpenseFilters {
    pub group_id: Option<GroupId>,
    pub category: Option<ExpenseCategory>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub page: Option<u32>,
    pub size: Option<u32>,
}

impl ExpenseFilters {
    pub fn for_group(group_id: GroupId) -> Self {
        Self {
            group_id: Some(group_id),
            ..Default::default()
        }
    }

    pub fn to_query(&self) -> Vec<(String, String)> {
        let mut query = Vec::new();
        if let Some(group_id) = self.group_id {
            query.push(("groupId".to_string(), group_id.to_string()));
        }
        if let Some(category) = self.category {
            query.push(("category".to_string(), category.as_str().to_string()));
        }
        if let Some(start) = self.start_date {
            query.push(("startDate".to_string(), start.to_string()));
        }
        if let Some(end) = self.end_date {
            query.push(("endDate".to_string(), end.to_string()));
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
