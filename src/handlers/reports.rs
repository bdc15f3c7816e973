use axum::{
    extract::{Path, State},
    Json,
};

use crate::{
    app::AppState,
    error::AppResult,
    models::{InventoryReport, IssueReport, ItemMovement},
    reports,
};

pub async fn inventory_report(State(state): State<AppState>) -> AppResult<Json<Vec<InventoryReport>>> {
    Ok(Json(reports::inventory_report(&state.db).await?))
}

pub async fn issue_report(State(state): State<AppState>) -> AppResult<Json<Vec<IssueReport>>> {
    Ok(Json(reports::issue_report(&state.db).await?))
}

pub async fn item_movement_report(
    State(state): State<AppState>,
    Path(item_id): Path<i64>,
) -> AppResult<Json<Vec<ItemMovement>>> {
    Ok(Json(reports::item_movement_report(&state.db, item_id).await?))
}
