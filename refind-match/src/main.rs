//! refind-match - Match Engine Microservice
//!
//! Scores newly reported lost/found items against candidate reports
//! of the opposite type and persists the pairs that clear the
//! admission threshold. Exposes the trigger surface over HTTP.

use std::sync::Arc;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use refind_common::config::{MatchingConfig, TomlConfig};
use refind_match::engine::{HttpImageClient, HttpTextClient};
use refind_match::AppState;

const LISTEN_ADDR: &str = "127.0.0.1:5741";

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    info!("Starting refind-match (Match Engine) microservice");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    // Resolve root folder and load the config file
    let cli_root = std::env::args().nth(1);
    let root_folder = refind_common::config::resolve_root_folder(cli_root.as_deref());
    let toml_config = TomlConfig::load(None)?;

    // Configuration errors are fatal here, before anything connects
    let matching_config = MatchingConfig::resolve(&toml_config.matching)?;
    info!(
        min_score = matching_config.min_score,
        policy = ?matching_config.missing_image_policy,
        "Matching configuration loaded"
    );

    // Open or create the database
    let db_path = root_folder.join("refind.db");
    info!("Database: {}", db_path.display());
    let db_pool = refind_common::db::init_database_pool(&db_path).await?;
    info!("Database connection established");

    // External similarity services
    let text_client = Arc::new(HttpTextClient::new(
        &matching_config.text_service_url,
        matching_config.provider_timeout,
    )?);
    let image_client = Arc::new(HttpImageClient::new(
        &matching_config.image_service_url,
        matching_config.provider_timeout,
    )?);

    let state = AppState::new(db_pool, matching_config, text_client, image_client);
    let app = refind_match::build_router(state);

    let listener = tokio::net::TcpListener::bind(LISTEN_ADDR).await?;
    info!("Listening on http://{}", LISTEN_ADDR);
    info!("Health check: http://{}/health", LISTEN_ADDR);

    axum::serve(listener, app).await?;

    Ok(())
}
