use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    app::AppState,
    error::AppResult,
    models::{Location, LocationInput},
    store::locations,
};

pub async fn list_locations(State(state): State<AppState>) -> AppResult<Json<Vec<Location>>> {
    Ok(Json(locations::list(&state.db).await?))
}

pub async fn create_location(
    State(state): State<AppState>,
    Json(input): Json<LocationInput>,
) -> AppResult<(StatusCode, Json<Location>)> {
    let location = locations::create(&state.db, &input).await?;
    Ok((StatusCode::CREATED, Json(location)))
}

pub async fn get_location(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<Location>> {
    Ok(Json(locations::get(&state.db, id).await?))
}

pub async fn update_location(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<LocationInput>,
) -> AppResult<Json<Location>> {
    Ok(Json(locations::update(&state.db, id, &input).await?))
}

pub async fn delete_location(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    locations::delete(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
