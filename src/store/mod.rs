//! Persistence gateway: the SQL behind items, locations, issues and users.
//!
//! Read helpers are generic over [`sqlx::SqliteExecutor`] so the workflow can
//! run them inside its own transaction; plain CRUD takes the pool directly.

pub mod issues;
pub mod items;
pub mod locations;
pub mod users;
