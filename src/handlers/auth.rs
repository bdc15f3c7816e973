use axum::{extract::State, http::StatusCode, Json};
use tower_cookies::{Cookie, Cookies};

use crate::{
    app::AppState,
    error::{AppError, AppResult},
    middleware::{get_current_user, CurrentUser, AUTH_COOKIE},
    models::{LoginRequest, User, UserResponse},
    store::users,
    utils::{auth::TOKEN_TTL_HOURS, create_token, verify_password},
};

pub async fn login(
    State(state): State<AppState>,
    cookies: Cookies,
    Json(form): Json<LoginRequest>,
) -> AppResult<Json<UserResponse>> {
    let user = authenticate_user(&state, &form.username, &form.password).await?;

    let token = create_token(&user, &state.config.jwt_secret)?;

    // Set secure HTTP-only cookie with JWT token
    let cookie = Cookie::build((AUTH_COOKIE, token))
        .path("/")
        .http_only(true)
        .max_age(time::Duration::hours(TOKEN_TTL_HOURS))
        .build();
    cookies.add(cookie);

    tracing::info!(user_id = user.id, "user logged in");
    Ok(Json(user.into()))
}

pub async fn logout(cookies: Cookies) -> StatusCode {
    cookies.remove(Cookie::build((AUTH_COOKIE, "")).path("/").build());
    StatusCode::NO_CONTENT
}

pub async fn me(State(state): State<AppState>, cookies: Cookies) -> AppResult<Json<CurrentUser>> {
    get_current_user(&cookies, &state)
        .await
        .map(Json)
        .ok_or(AppError::Unauthorized)
}

async fn authenticate_user(state: &AppState, username: &str, password: &str) -> AppResult<User> {
    let user = users::find_by_username(&state.db, username)
        .await?
        .ok_or(AppError::Unauthorized)?;

    if verify_password(password, &user.password_hash).unwrap_or(false) {
        Ok(user)
    } else {
        Err(AppError::Unauthorized)
    }
}
