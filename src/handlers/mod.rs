pub mod auth;
pub mod issues;
pub mod items;
pub mod locations;
pub mod reports;

use axum::Json;
use serde_json::{json, Value};

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
