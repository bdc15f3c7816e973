use crate::{
    database::Database,
    error::AppResult,
    models::{CreateUser, ItemInput, LocationInput, Role},
    store::{items, locations, users},
};

const SAMPLE_ITEMS: [(&str, &str, i64); 5] = [
    ("Laptop", "High-performance laptop", 50),
    ("Smartphone", "Latest model smartphone", 100),
    ("Tablet", "10-inch tablet", 30),
    ("Headphones", "Noise-cancelling headphones", 75),
    ("Monitor", "27-inch 4K monitor", 20),
];

const SAMPLE_LOCATIONS: [(&str, i64); 5] = [
    ("Warehouse A", 1000),
    ("Warehouse B", 800),
    ("Store 1", 200),
    ("Store 2", 150),
    ("Distribution Center", 2000),
];

/// Fills an empty database with demo items, locations and an `admin` user.
/// Returns `false` without writing anything when items already exist.
pub async fn seed_sample_data(db: &Database, admin_password: &str) -> AppResult<bool> {
    let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM items")
        .fetch_one(db)
        .await?;
    if existing > 0 {
        tracing::debug!(existing, "items present, skipping sample data");
        return Ok(false);
    }

    for (name, description, quantity) in SAMPLE_ITEMS {
        let input = ItemInput {
            name: name.to_string(),
            description: Some(description.to_string()),
            quantity,
        };
        items::create(db, &input).await?;
    }

    for (name, capacity) in SAMPLE_LOCATIONS {
        let input = LocationInput {
            name: name.to_string(),
            capacity,
        };
        locations::create(db, &input).await?;
    }

    if users::find_by_username(db, "admin").await?.is_none() {
        let admin = CreateUser {
            username: "admin".to_string(),
            password: admin_password.to_string(),
            role: Role::Admin,
        };
        users::create(db, &admin).await?;
    }

    tracing::info!("sample data seeded");
    Ok(true)
}
