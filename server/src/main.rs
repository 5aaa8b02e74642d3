//! Masjid admin HTTP server.
//!
//! Reads settings from the environment (and `.env`), prepares the database and serves the API.

use masjid_admin::{
    app, apply_migrations, ensure_database_exists, resource, AppState, Catalog, LocalDiskStorage,
    Settings,
};
use std::sync::Arc;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("masjid_admin=info")),
        )
        .init();

    let settings = Settings::from_env()?;
    let catalog = Catalog::standard();
    resource::validate(&catalog)?;

    ensure_database_exists(&settings.database_url).await?;
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(settings.db_max_connections)
        .connect(&settings.database_url)
        .await?;
    apply_migrations(&pool, &catalog).await?;

    tokio::fs::create_dir_all(&settings.storage_root).await?;
    let storage = Arc::new(LocalDiskStorage::new(settings.storage_root.clone()));
    let bind_addr = settings.bind_addr;
    let state = AppState::new(pool, catalog, storage, settings);

    let listener = TcpListener::bind(bind_addr).await?;
    tracing::info!("masjid admin listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app(state)).await?;
    Ok(())
}
