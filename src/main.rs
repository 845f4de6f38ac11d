use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use devcamper_api::config::AppConfig;
use devcamper_api::database::{MemoryStore, PgStore, SharedStore};
use devcamper_api::{router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AppConfig::from_env();
    info!("Starting DevCamper API in {:?} mode", config.environment);
    if config.security.jwt_secret.is_empty() {
        anyhow::bail!("JWT_SECRET must be set in {:?} mode", config.environment);
    }

    let store: SharedStore = if config.database.url.is_some() {
        let store = PgStore::connect(&config.database).await?;
        store.migrate().await?;
        info!("Connected to PostgreSQL");
        Arc::new(store)
    } else if config.is_production() {
        anyhow::bail!("DATABASE_URL must be set in production mode");
    } else {
        warn!("DATABASE_URL not set; using the in-memory store, data is lost on exit");
        Arc::new(MemoryStore::new())
    };

    let port = config.api.port;
    let app = router(AppState::new(store, config));

    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    info!("DevCamper API listening on http://{}", bind_addr);

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;
    Ok(())
}
