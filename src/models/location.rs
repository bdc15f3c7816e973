use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::error::{AppError, AppResult};

/// A storage location. `capacity` is recorded but not checked against stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Location {
    pub id: i64,
    pub name: String,
    pub capacity: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationInput {
    pub name: String,
    pub capacity: i64,
}

impl LocationInput {
    pub fn validate(&self) -> AppResult<()> {
        if self.name.trim().is_empty() {
            return Err(AppError::validation("location name must not be empty"));
        }
        if self.capacity < 0 {
            return Err(AppError::validation("location capacity must not be negative"));
        }
        Ok(())
    }
}
