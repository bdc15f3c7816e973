use anyhow::Context;
use dotenvy::dotenv;

use stockroom::{create_database_pool, create_router, run_migrations, seed, AppState, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenv().ok();

    // Initialize logging; tracing events are forwarded through the `log` facade.
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::from_env().context("invalid configuration")?;

    let db = create_database_pool(&config.database_url, config.db_max_connections)
        .await
        .context("failed to connect to database")?;
    run_migrations(&db).await.context("failed to run migrations")?;

    if config.seed_sample_data {
        seed::seed_sample_data(&db, &config.admin_password)
            .await
            .context("failed to seed sample data")?;
    }

    let addr = config.bind_address();
    let app = create_router(AppState::new(db, config));

    tracing::info!(%addr, "stockroom server starting");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    axum::serve(listener, app).await?;

    Ok(())
}
