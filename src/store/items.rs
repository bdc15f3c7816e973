use sqlx::{SqliteConnection, SqliteExecutor};

use crate::{
    database::Database,
    error::{is_foreign_key_violation, AppError, AppResult},
    models::{Item, ItemInput, ItemPage, ItemQuery},
};

const ITEM_COLUMNS: &str = "id, name, description, quantity";

pub async fn create(db: &Database, input: &ItemInput) -> AppResult<Item> {
    input.validate()?;

    let item = sqlx::query_as::<_, Item>(&format!(
        "INSERT INTO items (name, description, quantity) VALUES (?, ?, ?) RETURNING {ITEM_COLUMNS}"
    ))
    .bind(input.name.trim())
    .bind(input.normalized_description())
    .bind(input.quantity)
    .fetch_one(db)
    .await?;

    Ok(item)
}

pub async fn find<'e, E>(executor: E, id: i64) -> Result<Option<Item>, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query_as::<_, Item>(&format!("SELECT {ITEM_COLUMNS} FROM items WHERE id = ?"))
        .bind(id)
        .fetch_optional(executor)
        .await
}

pub async fn get(db: &Database, id: i64) -> AppResult<Item> {
    find(db, id).await?.ok_or(AppError::not_found("item", id))
}

pub async fn update(db: &Database, id: i64, input: &ItemInput) -> AppResult<Item> {
    input.validate()?;

    sqlx::query_as::<_, Item>(&format!(
        "UPDATE items SET name = ?, description = ?, quantity = ? WHERE id = ? RETURNING {ITEM_COLUMNS}"
    ))
    .bind(input.name.trim())
    .bind(input.normalized_description())
    .bind(input.quantity)
    .bind(id)
    .fetch_optional(db)
    .await?
    .ok_or(AppError::not_found("item", id))
}

pub async fn delete(db: &Database, id: i64) -> AppResult<()> {
    let result = sqlx::query("DELETE FROM items WHERE id = ?")
        .bind(id)
        .execute(db)
        .await
        .map_err(|e| {
            if is_foreign_key_violation(&e) {
                AppError::conflict(format!("item {id} is referenced by existing issues"))
            } else {
                AppError::from(e)
            }
        })?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found("item", id));
    }
    Ok(())
}

/// One page of items, optionally filtered by a substring of name or description.
pub async fn list(db: &Database, query: &ItemQuery) -> AppResult<ItemPage> {
    let pattern = query.search_pattern();
    let (page, limit) = (query.page(), query.limit());

    let total: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM items WHERE (?1 IS NULL OR name LIKE ?1 OR description LIKE ?1)",
    )
    .bind(&pattern)
    .fetch_one(db)
    .await?;

    let items = sqlx::query_as::<_, Item>(&format!(
        "SELECT {ITEM_COLUMNS} FROM items \
         WHERE (?1 IS NULL OR name LIKE ?1 OR description LIKE ?1) \
         ORDER BY id LIMIT ?2 OFFSET ?3"
    ))
    .bind(&pattern)
    .bind(limit)
    .bind(query.offset())
    .fetch_all(db)
    .await?;

    Ok(ItemPage {
        items,
        total,
        page,
        limit,
    })
}

/// Takes `quantity` units out of an item's stock and returns what is left.
///
/// The stock check and the write are one guarded `UPDATE`, so the row can
/// never go below zero no matter how callers interleave. Must run inside the
/// caller's transaction; on error nothing has been written by this call.
pub async fn withdraw(conn: &mut SqliteConnection, item_id: i64, quantity: i64) -> AppResult<i64> {
    let remaining: Option<i64> = sqlx::query_scalar(
        "UPDATE items SET quantity = quantity - ?1 WHERE id = ?2 AND quantity >= ?1 RETURNING quantity",
    )
    .bind(quantity)
    .bind(item_id)
    .fetch_optional(&mut *conn)
    .await?;

    if let Some(remaining) = remaining {
        return Ok(remaining);
    }

    match find(&mut *conn, item_id).await? {
        Some(item) => Err(AppError::InsufficientStock {
            item_id,
            available: item.quantity,
            requested: quantity,
        }),
        None => Err(AppError::not_found("item", item_id)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::testing::memory_db;

    fn input(name: &str, description: Option<&str>, quantity: i64) -> ItemInput {
        ItemInput {
            name: name.to_string(),
            description: description.map(str::to_string),
            quantity,
        }
    }

    #[tokio::test]
    async fn create_then_get_round_trips() {
        let db = memory_db().await;

        let created = create(&db, &input("Laptop", Some("14 inch"), 50)).await.unwrap();
        let fetched = get(&db, created.id).await.unwrap();

        assert_eq!(created, fetched);
        assert_eq!(fetched.name, "Laptop");
        assert_eq!(fetched.description.as_deref(), Some("14 inch"));
        assert_eq!(fetched.quantity, 50);
    }

    #[tokio::test]
    async fn update_replaces_fields() {
        let db = memory_db().await;
        let item = create(&db, &input("Tablet", None, 3)).await.unwrap();

        let updated = update(&db, item.id, &input("Tablet Pro", Some("11 inch"), 20))
            .await
            .unwrap();

        assert_eq!(updated.id, item.id);
        assert_eq!(updated.name, "Tablet Pro");
        assert_eq!(updated.quantity, 20);
        assert_eq!(get(&db, item.id).await.unwrap(), updated);
    }

    #[tokio::test]
    async fn missing_item_is_not_found() {
        let db = memory_db().await;

        assert!(matches!(get(&db, 99).await, Err(AppError::NotFound { entity: "item", id: 99 })));
        assert!(matches!(
            update(&db, 99, &input("x", None, 1)).await,
            Err(AppError::NotFound { .. })
        ));
        assert!(matches!(delete(&db, 99).await, Err(AppError::NotFound { .. })));
    }

    #[tokio::test]
    async fn delete_removes_item() {
        let db = memory_db().await;
        let item = create(&db, &input("Headphones", None, 7)).await.unwrap();

        delete(&db, item.id).await.unwrap();

        assert!(find(&db, item.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn referenced_item_delete_is_a_conflict() {
        let db = memory_db().await;
        let item = create(&db, &input("Laptop", None, 50)).await.unwrap();
        crate::workflow::request_issue(&db, &crate::models::IssueRequest::new(item.id, 2))
            .await
            .unwrap();

        assert!(matches!(delete(&db, item.id).await, Err(AppError::Conflict(_))));
        assert_eq!(get(&db, item.id).await.unwrap().quantity, 50);
    }

    #[tokio::test]
    async fn list_pages_and_searches() {
        let db = memory_db().await;
        for name in ["Laptop", "Smartphone", "Tablet", "Headphones", "Monitor"] {
            create(&db, &input(name, None, 10)).await.unwrap();
        }
        create(&db, &input("Dock", Some("USB-C laptop dock"), 2)).await.unwrap();

        let page = list(&db, &ItemQuery { page: Some(2), limit: Some(4), search: None })
            .await
            .unwrap();
        assert_eq!(page.total, 6);
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[0].name, "Monitor");

        let found = list(&db, &ItemQuery { search: Some("LAPTOP".into()), ..Default::default() })
            .await
            .unwrap();
        let names: Vec<_> = found.items.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(found.total, 2);
        assert_eq!(names, vec!["Laptop", "Dock"]);
    }

    #[tokio::test]
    async fn withdraw_refuses_to_go_negative() {
        let db = memory_db().await;
        let item = create(&db, &input("Monitor", None, 5)).await.unwrap();
        let mut conn = db.acquire().await.unwrap();

        let err = withdraw(&mut conn, item.id, 10).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::InsufficientStock { available: 5, requested: 10, .. }
        ));

        assert_eq!(withdraw(&mut conn, item.id, 5).await.unwrap(), 0);
        assert!(matches!(
            withdraw(&mut conn, 404, 1).await,
            Err(AppError::NotFound { entity: "item", .. })
        ));
    }
}
