//! Provisioning server: PostgreSQL catalog, MySQL and MongoDB targets.
//!
//! Run from repo root: `cargo run -p example-consumer`

use schema_provisioner::{
    app, ensure_database_exists, AppState, BackendConnector, PgCatalogStore, Provisioner, Settings, Vault,
};
use std::sync::Arc;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("schema_provisioner=info")),
        )
        .init();

    let settings = Settings::from_env()?;
    ensure_database_exists(&settings.database_url).await?;
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&settings.database_url)
        .await?;

    let catalog = PgCatalogStore::new(pool, settings.catalog_schema.clone())?;
    catalog.ensure_catalog_tables().await?;

    let provisioner = Provisioner::new(
        Vault::new(settings.encryption_key.clone()),
        Arc::new(BackendConnector::new()),
        Arc::new(catalog),
    );

    let mut events = provisioner.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => tracing::info!(?event, "catalog changed"),
                Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "catalog event listener lagged")
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    let state = AppState::new(provisioner);
    let listener = TcpListener::bind(settings.bind_addr).await?;
    tracing::info!("listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app(state, settings.body_limit_bytes)).await?;
    Ok(())
}
