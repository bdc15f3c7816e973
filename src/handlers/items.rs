use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::{
    app::AppState,
    error::AppResult,
    models::{Item, ItemInput, ItemPage, ItemQuery},
    store::items,
};

pub async fn list_items(
    State(state): State<AppState>,
    Query(query): Query<ItemQuery>,
) -> AppResult<Json<ItemPage>> {
    Ok(Json(items::list(&state.db, &query).await?))
}

pub async fn create_item(
    State(state): State<AppState>,
    Json(input): Json<ItemInput>,
) -> AppResult<(StatusCode, Json<Item>)> {
    let item = items::create(&state.db, &input).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

pub async fn get_item(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<Item>> {
    Ok(Json(items::get(&state.db, id).await?))
}

pub async fn update_item(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<ItemInput>,
) -> AppResult<Json<Item>> {
    Ok(Json(items::update(&state.db, id, &input).await?))
}

pub async fn delete_item(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    items::delete(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
