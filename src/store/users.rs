use crate::{
    database::Database,
    error::{AppError, AppResult},
    models::{CreateUser, User},
    utils::hash_password,
};

pub async fn find_by_username(db: &Database, username: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(
        "SELECT id, username, password_hash, role FROM users WHERE username = ?",
    )
    .bind(username)
    .fetch_optional(db)
    .await
}

pub async fn find_by_id(db: &Database, id: i64) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT id, username, password_hash, role FROM users WHERE id = ?")
        .bind(id)
        .fetch_optional(db)
        .await
}

pub async fn create(db: &Database, user: &CreateUser) -> AppResult<User> {
    if user.username.trim().is_empty() || user.password.is_empty() {
        return Err(AppError::validation("username and password are required"));
    }

    let password_hash = hash_password(&user.password)?;

    let created = sqlx::query_as::<_, User>(
        "INSERT INTO users (username, password_hash, role) VALUES (?, ?, ?) \
         RETURNING id, username, password_hash, role",
    )
    .bind(user.username.trim())
    .bind(&password_hash)
    .bind(user.role)
    .fetch_one(db)
    .await
    .map_err(|e| match &e {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            AppError::conflict(format!("username {:?} is taken", user.username.trim()))
        }
        _ => AppError::from(e),
    })?;

    Ok(created)
}
