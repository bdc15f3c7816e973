use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqliteExecutor};

use crate::{
    database::Database,
    error::{AppError, AppResult},
    models::{Issue, IssueDetail, IssueRequest, IssueStatus},
};

const ISSUE_COLUMNS: &str = "id, item_id, quantity, from_location_id, to_location_id, \
                             status, created_at, approved_at, approved_by";

const DETAIL_SELECT: &str = "\
    SELECT i.id, i.item_id, it.name AS item_name, i.quantity, \
           i.from_location_id, fl.name AS from_location_name, \
           i.to_location_id, tl.name AS to_location_name, \
           i.status, i.created_at, i.approved_at, i.approved_by \
    FROM issues i \
    JOIN items it ON it.id = i.item_id \
    LEFT JOIN locations fl ON fl.id = i.from_location_id \
    LEFT JOIN locations tl ON tl.id = i.to_location_id";

/// Writes a new issue row. An issue inserted as `Approved` records `now` as
/// its approval time.
pub async fn insert(
    conn: &mut SqliteConnection,
    request: &IssueRequest,
    status: IssueStatus,
    now: DateTime<Utc>,
    approved_by: Option<&str>,
) -> Result<Issue, sqlx::Error> {
    let approved_at = (status == IssueStatus::Approved).then_some(now);

    sqlx::query_as::<_, Issue>(&format!(
        "INSERT INTO issues (item_id, quantity, from_location_id, to_location_id, status, created_at, approved_at, approved_by) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?) RETURNING {ISSUE_COLUMNS}"
    ))
    .bind(request.item_id)
    .bind(request.quantity)
    .bind(request.from_location_id)
    .bind(request.to_location_id)
    .bind(status)
    .bind(now)
    .bind(approved_at)
    .bind(approved_by)
    .fetch_one(conn)
    .await
}

pub async fn find<'e, E>(executor: E, id: i64) -> Result<Option<Issue>, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query_as::<_, Issue>(&format!("SELECT {ISSUE_COLUMNS} FROM issues WHERE id = ?"))
        .bind(id)
        .fetch_optional(executor)
        .await
}

pub async fn get_detail(db: &Database, id: i64) -> AppResult<IssueDetail> {
    sqlx::query_as::<_, IssueDetail>(&format!("{DETAIL_SELECT} WHERE i.id = ?"))
        .bind(id)
        .fetch_optional(db)
        .await?
        .ok_or(AppError::not_found("issue", id))
}

/// Pending issues, oldest first, in the order an approver works through them.
pub async fn list_pending(db: &Database) -> AppResult<Vec<IssueDetail>> {
    let issues = sqlx::query_as::<_, IssueDetail>(&format!(
        "{DETAIL_SELECT} WHERE i.status = 'pending' ORDER BY i.created_at, i.id"
    ))
    .fetch_all(db)
    .await?;
    Ok(issues)
}

/// Moves a pending issue to `to`, returning the updated row, or `None` when
/// the issue is missing or no longer pending. The status guard in the
/// `WHERE` clause makes this a compare-and-swap.
pub async fn settle(
    conn: &mut SqliteConnection,
    id: i64,
    to: IssueStatus,
    approved_at: Option<DateTime<Utc>>,
    approved_by: Option<&str>,
) -> Result<Option<Issue>, sqlx::Error> {
    sqlx::query_as::<_, Issue>(&format!(
        "UPDATE issues SET status = ?, approved_at = ?, approved_by = ? \
         WHERE id = ? AND status = 'pending' RETURNING {ISSUE_COLUMNS}"
    ))
    .bind(to)
    .bind(approved_at)
    .bind(approved_by)
    .bind(id)
    .fetch_optional(conn)
    .await
}
