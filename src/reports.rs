//! Read-only projections over items and issues, recomputed on every call.

use crate::{
    database::Database,
    error::{AppError, AppResult},
    models::{InventoryReport, IssueReport, ItemMovement},
    store::items,
};

/// Every item with its stock on hand and the total of its approved issues.
pub async fn inventory_report(db: &Database) -> AppResult<Vec<InventoryReport>> {
    let report = sqlx::query_as::<_, InventoryReport>(
        r#"
        SELECT it.id, it.name, it.quantity,
               COALESCE(SUM(CASE WHEN i.status = 'approved' THEN i.quantity END), 0) AS issued_quantity
        FROM items it
        LEFT JOIN issues i ON i.item_id = it.id
        GROUP BY it.id, it.name, it.quantity
        ORDER BY it.id
        "#,
    )
    .fetch_all(db)
    .await?;

    Ok(report)
}

/// All issues, newest first.
pub async fn issue_report(db: &Database) -> AppResult<Vec<IssueReport>> {
    let report = sqlx::query_as::<_, IssueReport>(
        r#"
        SELECT i.id, i.item_id, it.name AS item_name, i.quantity,
               fl.name AS from_location, tl.name AS to_location,
               i.status, i.created_at
        FROM issues i
        JOIN items it ON it.id = i.item_id
        LEFT JOIN locations fl ON fl.id = i.from_location_id
        LEFT JOIN locations tl ON tl.id = i.to_location_id
        ORDER BY i.created_at DESC, i.id DESC
        "#,
    )
    .fetch_all(db)
    .await?;

    Ok(report)
}

pub async fn item_movement_report(db: &Database, item_id: i64) -> AppResult<Vec<ItemMovement>> {
    if items::find(db, item_id).await?.is_none() {
        return Err(AppError::not_found("item", item_id));
    }

    let movements = sqlx::query_as::<_, ItemMovement>(
        r#"
        SELECT i.id AS issue_id, i.quantity,
               fl.name AS from_location, tl.name AS to_location,
               i.status, i.created_at
        FROM issues i
        LEFT JOIN locations fl ON fl.id = i.from_location_id
        LEFT JOIN locations tl ON tl.id = i.to_location_id
        WHERE i.item_id = ?
        ORDER BY i.created_at DESC, i.id DESC
        "#,
    )
    .bind(item_id)
    .fetch_all(db)
    .await?;

    Ok(movements)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        database::testing::memory_db,
        models::{IssueRequest, IssueStatus, ItemInput, LocationInput},
        store::locations,
        workflow,
    };

    async fn item(db: &Database, name: &str, quantity: i64) -> i64 {
        items::create(db, &ItemInput { name: name.into(), description: None, quantity })
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn inventory_counts_only_approved_issues() {
        let db = memory_db().await;
        let laptop = item(&db, "Laptop", 50).await;
        let phone = item(&db, "Smartphone", 30).await;
        let tablet = item(&db, "Tablet", 20).await;

        let a = workflow::request_issue(&db, &IssueRequest::new(laptop, 5)).await.unwrap();
        workflow::request_issue(&db, &IssueRequest::new(laptop, 3)).await.unwrap();
        let c = workflow::request_issue(&db, &IssueRequest::new(phone, 2)).await.unwrap();
        let d = workflow::request_issue(&db, &IssueRequest::new(phone, 4)).await.unwrap();
        workflow::approve_issue(&db, a.id, None).await.unwrap();
        workflow::approve_issue(&db, c.id, None).await.unwrap();
        workflow::deny_issue(&db, d.id).await.unwrap();

        let report = inventory_report(&db).await.unwrap();

        let rows: Vec<_> = report.iter().map(|r| (r.id, r.quantity, r.issued_quantity)).collect();
        assert_eq!(rows, vec![(laptop, 45, 5), (phone, 28, 2), (tablet, 20, 0)]);
    }

    #[tokio::test]
    async fn issue_report_is_newest_first_with_names() {
        let db = memory_db().await;
        let laptop = item(&db, "Laptop", 50).await;
        let monitor = item(&db, "Monitor", 5).await;
        let warehouse = locations::create(&db, &LocationInput { name: "Warehouse A".into(), capacity: 1000 })
            .await
            .unwrap();
        let store = locations::create(&db, &LocationInput { name: "Store 1".into(), capacity: 50 })
            .await
            .unwrap();

        let first = workflow::request_issue(
            &db,
            &IssueRequest::new(laptop, 1).from_location(warehouse.id).to_location(store.id),
        )
        .await
        .unwrap();
        let second = workflow::request_issue(&db, &IssueRequest::new(monitor, 2)).await.unwrap();

        let report = issue_report(&db).await.unwrap();

        assert_eq!(report.len(), 2);
        assert_eq!(report[0].id, second.id);
        assert_eq!(report[0].item_name, "Monitor");
        assert_eq!(report[0].from_location, None);
        assert_eq!(report[1].id, first.id);
        assert_eq!(report[1].from_location.as_deref(), Some("Warehouse A"));
        assert_eq!(report[1].to_location.as_deref(), Some("Store 1"));
        assert_eq!(report[1].status, IssueStatus::Pending);
    }

    #[tokio::test]
    async fn movement_report_is_scoped_to_one_item() {
        let db = memory_db().await;
        let laptop = item(&db, "Laptop", 50).await;
        let phone = item(&db, "Smartphone", 30).await;

        let a = workflow::request_issue(&db, &IssueRequest::new(laptop, 5)).await.unwrap();
        let b = workflow::request_issue(&db, &IssueRequest::new(laptop, 3)).await.unwrap();
        workflow::request_issue(&db, &IssueRequest::new(phone, 2)).await.unwrap();
        workflow::approve_issue(&db, a.id, None).await.unwrap();

        let movements = item_movement_report(&db, laptop).await.unwrap();

        let ids: Vec<_> = movements.iter().map(|m| (m.issue_id, m.status)).collect();
        assert_eq!(ids, vec![(b.id, IssueStatus::Pending), (a.id, IssueStatus::Approved)]);

        assert_eq!(item_movement_report(&db, phone).await.unwrap().len(), 1);
        assert!(matches!(
            item_movement_report(&db, 404).await,
            Err(AppError::NotFound { entity: "item", .. })
        ));
    }
}
