use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use products_api::{
    build_router,
    config::{Config, StorageBackend},
    store::{MemoryProductStore, PgProductStore, ProductStore},
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present (ignored in production where env vars are injected)
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,products_api=debug")),
        )
        .with_target(false)
        .compact()
        .init();

    let config = Config::from_env()?;

    let store: Arc<dyn ProductStore> = match config.storage {
        StorageBackend::Postgres => {
            let url = config
                .database_url
                .as_deref()
                .context("DATABASE_URL must be set")?;

            info!("Connecting to PostgreSQL...");
            let store = PgProductStore::connect(url, config.max_connections)
                .await
                .context("failed to connect to PostgreSQL")?;
            info!("Database connection pool established.");

            store
                .ensure_schema()
                .await
                .context("failed to create products schema")?;
            Arc::new(store)
        }
        StorageBackend::Memory => {
            info!("Using in-memory product store; data is lost on restart.");
            Arc::new(MemoryProductStore::new())
        }
    };

    let app = build_router(AppState::new(store));

    let addr = format!("{}:{}", config.host, config.port);
    info!(backend = ?config.storage, "products-api listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
