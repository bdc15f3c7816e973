use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::IssueStatus;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct InventoryReport {
    pub id: i64,
    pub name: String,
    pub quantity: i64,
    pub issued_quantity: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct IssueReport {
    pub id: i64,
    pub item_id: i64,
    pub item_name: String,
    pub quantity: i64,
    pub from_location: Option<String>,
    pub to_location: Option<String>,
    pub status: IssueStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct ItemMovement {
    pub issue_id: i64,
    pub quantity: i64,
    pub from_location: Option<String>,
    pub to_location: Option<String>,
    pub status: IssueStatus,
    pub created_at: DateTime<Utc>,
}
