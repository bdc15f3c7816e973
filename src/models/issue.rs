use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum IssueStatus {
    Pending,
    Approved,
    Denied,
}

impl IssueStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Denied => "denied",
        }
    }
}

impl fmt::Display for IssueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Issue {
    pub id: i64,
    pub item_id: i64,
    pub quantity: i64,
    pub from_location_id: Option<i64>,
    pub to_location_id: Option<i64>,
    pub status: IssueStatus,
    pub created_at: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
    pub approved_by: Option<String>,
}

/// An issue joined with the names of the item and locations it refers to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct IssueDetail {
    pub id: i64,
    pub item_id: i64,
    pub item_name: String,
    pub quantity: i64,
    pub from_location_id: Option<i64>,
    pub from_location_name: Option<String>,
    pub to_location_id: Option<i64>,
    pub to_location_name: Option<String>,
    pub status: IssueStatus,
    pub created_at: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
    pub approved_by: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueRequest {
    pub item_id: i64,
    pub quantity: i64,
    #[serde(default)]
    pub from_location_id: Option<i64>,
    #[serde(default)]
    pub to_location_id: Option<i64>,
}

impl IssueRequest {
    pub fn new(item_id: i64, quantity: i64) -> Self {
        Self {
            item_id,
            quantity,
            from_location_id: None,
            to_location_id: None,
        }
    }

    pub fn from_location(mut self, location_id: i64) -> Self {
        self.from_location_id = Some(location_id);
        self
    }

    pub fn to_location(mut self, location_id: i64) -> Self {
        self.to_location_id = Some(location_id);
        self
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.quantity <= 0 {
            return Err(AppError::validation("issue quantity must be a positive integer"));
        }
        Ok(())
    }
}
