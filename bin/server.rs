// Address Selector - Web Server
// Serves the city list and per-city street lookup over HTTP

use address_selector::api::{create_router, AppState};
use address_selector::{get_all_cities, read_city_cache, Settings};
use anyhow::{Context, Result};
use rusqlite::Connection;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = Settings::from_env();

    if !settings.db_path.exists() {
        anyhow::bail!(
            "database not found at {} (run `address-selector import` first)",
            settings.db_path.display()
        );
    }

    let conn = Connection::open(&settings.db_path)
        .with_context(|| format!("Failed to open database {}", settings.db_path.display()))?;
    tracing::info!(path = %settings.db_path.display(), "database opened");

    let cities = match read_city_cache(&settings.cache_path) {
        Ok(cities) => cities,
        Err(err) => {
            tracing::warn!("{:#}; reading cities from the database", err);
            get_all_cities(&conn)?
        }
    };
    tracing::info!(count = cities.len(), "cities loaded");

    let app = create_router(AppState::new(conn, cities));

    let listener = tokio::net::TcpListener::bind(&settings.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", settings.bind_addr))?;

    tracing::info!("Server running on http://{}", settings.bind_addr);
    tracing::info!("API: http://{}/api/cities", settings.bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}
