use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use tower_cookies::Cookies;

use crate::{
    app::AppState,
    error::AppResult,
    middleware::get_current_user,
    models::{Issue, IssueDetail, IssueRequest},
    store::issues,
    workflow,
};

pub async fn request_issue(
    State(state): State<AppState>,
    Json(request): Json<IssueRequest>,
) -> AppResult<(StatusCode, Json<Issue>)> {
    let issue = workflow::request_issue(&state.db, &request).await?;
    Ok((StatusCode::CREATED, Json(issue)))
}

pub async fn issue_now(
    State(state): State<AppState>,
    cookies: Cookies,
    Json(request): Json<IssueRequest>,
) -> AppResult<(StatusCode, Json<IssueDetail>)> {
    let user = get_current_user(&cookies, &state).await;
    let issue = workflow::issue_now(
        &state.db,
        &request,
        user.as_ref().map(|u| u.username.as_str()),
    )
    .await?;
    Ok((StatusCode::CREATED, Json(issue)))
}

pub async fn pending_issues(State(state): State<AppState>) -> AppResult<Json<Vec<IssueDetail>>> {
    Ok(Json(issues::list_pending(&state.db).await?))
}

pub async fn get_issue(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<IssueDetail>> {
    Ok(Json(issues::get_detail(&state.db, id).await?))
}

/// Approves the issue, recording the logged-in user (if any) as approver.
pub async fn approve_issue(
    State(state): State<AppState>,
    cookies: Cookies,
    Path(id): Path<i64>,
) -> AppResult<Json<IssueDetail>> {
    let user = get_current_user(&cookies, &state).await;
    let issue = workflow::approve_issue(
        &state.db,
        id,
        user.as_ref().map(|u| u.username.as_str()),
    )
    .await?;
    Ok(Json(issue))
}

pub async fn deny_issue(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<IssueDetail>> {
    Ok(Json(workflow::deny_issue(&state.db, id).await?))
}
