//! Issue workflow: `pending -> approved` or `pending -> denied`, nothing else.
//!
//! Every transaction here opens with a write (insert the issue, settle its
//! status, or withdraw stock), which takes SQLite's writer lock before any
//! row is read. Under WAL a transaction that read first could not later be
//! promoted to a writer once another connection had committed, so reads
//! only ever follow the opening write. Concurrent workflow calls queue on
//! the busy timeout instead of failing. Every write is guarded
//! (`status = 'pending'`, `quantity >= ?`), and any error drops the
//! transaction, rolling back what the earlier statements did.

use chrono::Utc;

use crate::{
    database::Database,
    error::{is_foreign_key_violation, AppError, AppResult},
    models::{Issue, IssueDetail, IssueRequest, IssueStatus},
    store::{issues, items, locations},
};

/// Records a pending issue. Stock is not checked until approval.
pub async fn request_issue(db: &Database, request: &IssueRequest) -> AppResult<Issue> {
    request.validate()?;

    let mut tx = db.begin().await?;
    let issue = match issues::insert(&mut tx, request, IssueStatus::Pending, Utc::now(), None).await
    {
        Ok(issue) => issue,
        Err(e) if is_foreign_key_violation(&e) => {
            // The failed insert already holds the writer lock; name the missing row.
            ensure_references(&mut tx, request).await?;
            return Err(e.into());
        }
        Err(e) => return Err(e.into()),
    };
    tx.commit().await?;

    tracing::info!(
        issue_id = issue.id,
        item_id = issue.item_id,
        quantity = issue.quantity,
        "issue requested"
    );
    Ok(issue)
}

/// Approves a pending issue and takes its quantity out of the item's stock.
pub async fn approve_issue(
    db: &Database,
    id: i64,
    approved_by: Option<&str>,
) -> AppResult<IssueDetail> {
    let mut tx = db.begin().await?;

    let issue = match issues::settle(&mut tx, id, IssueStatus::Approved, Some(Utc::now()), approved_by)
        .await?
    {
        Some(issue) => issue,
        None => return Err(unsettled(&mut tx, id).await),
    };

    let remaining = match items::withdraw(&mut tx, issue.item_id, issue.quantity).await {
        Ok(remaining) => remaining,
        Err(e) => {
            tracing::warn!(issue_id = id, item_id = issue.item_id, error = %e, "approval rejected");
            return Err(e);
        }
    };

    tx.commit().await?;

    tracing::info!(
        issue_id = id,
        item_id = issue.item_id,
        quantity = issue.quantity,
        remaining,
        "issue approved"
    );
    issues::get_detail(db, id).await
}

/// Denies a pending issue. Stock is untouched; a settled issue cannot be denied.
pub async fn deny_issue(db: &Database, id: i64) -> AppResult<IssueDetail> {
    let mut tx = db.begin().await?;

    if issues::settle(&mut tx, id, IssueStatus::Denied, None, None)
        .await?
        .is_none()
    {
        return Err(unsettled(&mut tx, id).await);
    }
    tx.commit().await?;

    tracing::info!(issue_id = id, "issue denied");
    issues::get_detail(db, id).await
}

/// Issues stock immediately: the decrement and an already approved issue
/// record are written together or not at all.
pub async fn issue_now(
    db: &Database,
    request: &IssueRequest,
    issued_by: Option<&str>,
) -> AppResult<IssueDetail> {
    request.validate()?;

    let mut tx = db.begin().await?;
    let remaining = items::withdraw(&mut tx, request.item_id, request.quantity).await?;
    ensure_references(&mut tx, request).await?;
    let issue =
        issues::insert(&mut tx, request, IssueStatus::Approved, Utc::now(), issued_by).await?;
    tx.commit().await?;

    tracing::info!(
        issue_id = issue.id,
        item_id = issue.item_id,
        quantity = issue.quantity,
        remaining,
        "stock issued directly"
    );
    issues::get_detail(db, issue.id).await
}

async fn ensure_references(
    conn: &mut sqlx::SqliteConnection,
    request: &IssueRequest,
) -> AppResult<()> {
    if items::find(&mut *conn, request.item_id).await?.is_none() {
        return Err(AppError::not_found("item", request.item_id));
    }
    for location_id in [request.from_location_id, request.to_location_id]
        .into_iter()
        .flatten()
    {
        if locations::find(&mut *conn, location_id).await?.is_none() {
            return Err(AppError::not_found("location", location_id));
        }
    }
    Ok(())
}

/// Explains why `settle` matched no row.
async fn unsettled(conn: &mut sqlx::SqliteConnection, id: i64) -> AppError {
    match issues::find(&mut *conn, id).await {
        Ok(Some(issue)) => AppError::InvalidTransition {
            id,
            status: issue.status,
        },
        Ok(None) => AppError::not_found("issue", id),
        Err(e) => AppError::from(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        database::testing::{file_db, memory_db},
        models::{ItemInput, LocationInput},
        reports,
    };

    async fn item(db: &Database, name: &str, quantity: i64) -> i64 {
        items::create(db, &ItemInput { name: name.into(), description: None, quantity })
            .await
            .unwrap()
            .id
    }

    async fn quantity_of(db: &Database, item_id: i64) -> i64 {
        items::get(db, item_id).await.unwrap().quantity
    }

    #[tokio::test]
    async fn approving_decrements_stock_once() {
        let db = memory_db().await;
        let laptop = item(&db, "Laptop", 50).await;

        let issue = request_issue(&db, &IssueRequest::new(laptop, 10)).await.unwrap();
        assert_eq!(issue.status, IssueStatus::Pending);
        assert_eq!(quantity_of(&db, laptop).await, 50);

        let approved = approve_issue(&db, issue.id, Some("admin")).await.unwrap();
        assert_eq!(approved.status, IssueStatus::Approved);
        assert_eq!(approved.approved_by.as_deref(), Some("admin"));
        assert!(approved.approved_at.is_some());
        assert_eq!(quantity_of(&db, laptop).await, 40);

        let report = reports::inventory_report(&db).await.unwrap();
        assert_eq!(report[0].issued_quantity, 10);
        assert_eq!(report[0].quantity, 40);

        let err = approve_issue(&db, issue.id, None).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::InvalidTransition { status: IssueStatus::Approved, .. }
        ));
        assert_eq!(quantity_of(&db, laptop).await, 40);
    }

    #[tokio::test]
    async fn approval_beyond_stock_changes_nothing() {
        let db = memory_db().await;
        let monitor = item(&db, "Monitor", 5).await;
        let issue = request_issue(&db, &IssueRequest::new(monitor, 10)).await.unwrap();

        let err = approve_issue(&db, issue.id, None).await.unwrap_err();

        assert!(matches!(
            err,
            AppError::InsufficientStock { available: 5, requested: 10, .. }
        ));
        assert_eq!(quantity_of(&db, monitor).await, 5);
        let still = issues::get_detail(&db, issue.id).await.unwrap();
        assert_eq!(still.status, IssueStatus::Pending);
        assert_eq!(still.approved_at, None);
    }

    #[tokio::test]
    async fn denying_leaves_stock_alone_and_is_final() {
        let db = memory_db().await;
        let tablet = item(&db, "Tablet", 8).await;
        let issue = request_issue(&db, &IssueRequest::new(tablet, 3)).await.unwrap();

        let denied = deny_issue(&db, issue.id).await.unwrap();
        assert_eq!(denied.status, IssueStatus::Denied);
        assert_eq!(denied.approved_at, None);
        assert_eq!(quantity_of(&db, tablet).await, 8);

        assert!(matches!(
            deny_issue(&db, issue.id).await,
            Err(AppError::InvalidTransition { status: IssueStatus::Denied, .. })
        ));
        assert!(matches!(
            approve_issue(&db, issue.id, None).await,
            Err(AppError::InvalidTransition { .. })
        ));
        assert_eq!(quantity_of(&db, tablet).await, 8);
    }

    #[tokio::test]
    async fn unknown_issue_is_not_found() {
        let db = memory_db().await;

        assert!(matches!(
            approve_issue(&db, 77, None).await,
            Err(AppError::NotFound { entity: "issue", id: 77 })
        ));
        assert!(matches!(
            deny_issue(&db, 77).await,
            Err(AppError::NotFound { entity: "issue", id: 77 })
        ));
    }

    #[tokio::test]
    async fn request_validates_quantity_and_references() {
        let db = memory_db().await;
        let phone = item(&db, "Smartphone", 2).await;

        assert!(matches!(
            request_issue(&db, &IssueRequest::new(phone, 0)).await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            request_issue(&db, &IssueRequest::new(999, 1)).await,
            Err(AppError::NotFound { entity: "item", .. })
        ));
        assert!(matches!(
            request_issue(&db, &IssueRequest::new(phone, 1).from_location(12)).await,
            Err(AppError::NotFound { entity: "location", id: 12 })
        ));

        // More than is on hand is accepted; the check happens on approval.
        let issue = request_issue(&db, &IssueRequest::new(phone, 20)).await.unwrap();
        assert_eq!(issue.status, IssueStatus::Pending);
    }

    #[tokio::test]
    async fn direct_issue_checks_stock_before_recording() {
        let db = memory_db().await;
        let headphones = item(&db, "Headphones", 6).await;
        let store = locations::create(&db, &LocationInput { name: "Store 2".into(), capacity: 40 })
            .await
            .unwrap();

        let issued = issue_now(&db, &IssueRequest::new(headphones, 4).to_location(store.id), Some("sam"))
            .await
            .unwrap();
        assert_eq!(issued.status, IssueStatus::Approved);
        assert_eq!(issued.to_location_name.as_deref(), Some("Store 2"));
        assert_eq!(quantity_of(&db, headphones).await, 2);

        assert!(matches!(
            issue_now(&db, &IssueRequest::new(headphones, 3), None).await,
            Err(AppError::InsufficientStock { available: 2, requested: 3, .. })
        ));

        // A bad location rolls back the decrement that preceded the check.
        assert!(matches!(
            issue_now(&db, &IssueRequest::new(headphones, 1).from_location(404), None).await,
            Err(AppError::NotFound { entity: "location", .. })
        ));
        assert_eq!(quantity_of(&db, headphones).await, 2);
        assert_eq!(reports::issue_report(&db).await.unwrap().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_approvals_never_oversell() {
        let (db, _dir) = file_db(4).await;
        let laptop = item(&db, "Laptop", 10).await;
        let first = request_issue(&db, &IssueRequest::new(laptop, 6)).await.unwrap();
        let second = request_issue(&db, &IssueRequest::new(laptop, 6)).await.unwrap();

        let (a, b) = tokio::join!(
            tokio::spawn({
                let db = db.clone();
                async move { approve_issue(&db, first.id, None).await }
            }),
            tokio::spawn({
                let db = db.clone();
                async move { approve_issue(&db, second.id, None).await }
            }),
        );
        let results = [a.unwrap(), b.unwrap()];

        let succeeded = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(succeeded, 1);
        assert!(results
            .iter()
            .any(|r| matches!(r, Err(AppError::InsufficientStock { .. }))));
        assert_eq!(quantity_of(&db, laptop).await, 4);

        let pending = issues::list_pending(&db).await.unwrap();
        assert_eq!(pending.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_workflow_calls_all_succeed() {
        let (db, _dir) = file_db(8).await;
        let laptop = item(&db, "Laptop", 100).await;

        let mut to_approve = Vec::new();
        let mut to_deny = Vec::new();
        for _ in 0..4 {
            to_approve.push(request_issue(&db, &IssueRequest::new(laptop, 1)).await.unwrap().id);
            to_deny.push(request_issue(&db, &IssueRequest::new(laptop, 1)).await.unwrap().id);
        }

        let mut tasks = tokio::task::JoinSet::new();
        for _ in 0..32 {
            let db = db.clone();
            tasks.spawn(async move {
                request_issue(&db, &IssueRequest::new(laptop, 1)).await.map(|_| ())
            });
        }
        for id in to_approve {
            let db = db.clone();
            tasks.spawn(async move { approve_issue(&db, id, None).await.map(|_| ()) });
        }
        for id in to_deny {
            let db = db.clone();
            tasks.spawn(async move { deny_issue(&db, id).await.map(|_| ()) });
        }
        for _ in 0..4 {
            let db = db.clone();
            tasks.spawn(async move {
                issue_now(&db, &IssueRequest::new(laptop, 1), None).await.map(|_| ())
            });
        }

        let mut failures = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined.unwrap() {
                failures.push(e.to_string());
            }
        }

        assert!(failures.is_empty(), "failed workflow calls: {failures:?}");
        assert_eq!(quantity_of(&db, laptop).await, 92);
        assert_eq!(issues::list_pending(&db).await.unwrap().len(), 32);
        assert_eq!(reports::issue_report(&db).await.unwrap().len(), 44);
    }
}
