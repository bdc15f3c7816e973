//! Warehouse inventory backend: items, storage locations, an approval
//! workflow for issuing stock, and reports over the result.

pub mod app;
pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod reports;
pub mod seed;
pub mod store;
pub mod utils;
pub mod workflow;

pub use app::{create_router, AppState};
pub use config::Config;
pub use database::{create_database_pool, run_migrations, Database};
pub use error::{AppError, AppResult};
