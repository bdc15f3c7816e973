use sqlx::SqliteExecutor;

use crate::{
    database::Database,
    error::{is_foreign_key_violation, AppError, AppResult},
    models::{Location, LocationInput},
};

pub async fn create(db: &Database, input: &LocationInput) -> AppResult<Location> {
    input.validate()?;

    let location = sqlx::query_as::<_, Location>(
        "INSERT INTO locations (name, capacity) VALUES (?, ?) RETURNING id, name, capacity",
    )
    .bind(input.name.trim())
    .bind(input.capacity)
    .fetch_one(db)
    .await?;

    Ok(location)
}

pub async fn find<'e, E>(executor: E, id: i64) -> Result<Option<Location>, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query_as::<_, Location>("SELECT id, name, capacity FROM locations WHERE id = ?")
        .bind(id)
        .fetch_optional(executor)
        .await
}

pub async fn get(db: &Database, id: i64) -> AppResult<Location> {
    find(db, id).await?.ok_or(AppError::not_found("location", id))
}

pub async fn list(db: &Database) -> AppResult<Vec<Location>> {
    let locations =
        sqlx::query_as::<_, Location>("SELECT id, name, capacity FROM locations ORDER BY id")
            .fetch_all(db)
            .await?;
    Ok(locations)
}

pub async fn update(db: &Database, id: i64, input: &LocationInput) -> AppResult<Location> {
    input.validate()?;

    sqlx::query_as::<_, Location>(
        "UPDATE locations SET name = ?, capacity = ? WHERE id = ? RETURNING id, name, capacity",
    )
    .bind(input.name.trim())
    .bind(input.capacity)
    .bind(id)
    .fetch_optional(db)
    .await?
    .ok_or(AppError::not_found("location", id))
}

pub async fn delete(db: &Database, id: i64) -> AppResult<()> {
    let result = sqlx::query("DELETE FROM locations WHERE id = ?")
        .bind(id)
        .execute(db)
        .await
        .map_err(|e| {
            if is_foreign_key_violation(&e) {
                AppError::conflict(format!("location {id} is referenced by existing issues"))
            } else {
                AppError::from(e)
            }
        })?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found("location", id));
    }
    Ok(())
}
