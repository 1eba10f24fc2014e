use std::sync::Arc;

use anyhow::Context;

use pantry_infra::{Config, InventoryStore, SchemaStatus, db};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load `.env` before anything reads the environment (including RUST_LOG).
    let _ = dotenvy::dotenv();
    pantry_observability::init();

    let config = Config::from_env().context("invalid configuration")?;

    let adapter = db::connect(&config.database)
        .await
        .context("failed to connect to database")?;
    let store = Arc::new(InventoryStore::open(adapter).await);
    if let SchemaStatus::Unavailable { reason } = store.schema_status() {
        tracing::error!(%reason, "schema unavailable; inventory endpoints will answer 503");
    }

    let app = pantry_api::app::build_app(store, &config.cors_allow);

    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.listen_addr))?;

    tracing::info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
