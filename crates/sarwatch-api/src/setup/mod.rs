//! Application setup and initialization

pub mod routes;
pub mod server;

use std::sync::Arc;

use anyhow::{Context, Result};
use sarwatch_core::Config;
use sarwatch_db::create_catalog;

use crate::state::AppState;

/// Connect the catalog and build the router.
pub async fn initialize_app(config: &Config) -> Result<(Arc<AppState>, axum::Router)> {
    config
        .validate()
        .context("Configuration validation failed")?;
    if config.api.recent_products_days <= 0 {
        anyhow::bail!("RECENT_PRODUCTS_DAYS must be positive");
    }

    tracing::info!(
        environment = %config.environment,
        catalog = %config.catalog.backend,
        "Configuration loaded and validated successfully"
    );

    let catalog = create_catalog(&config.catalog)
        .await
        .context("Failed to initialize catalog")?;

    let state = Arc::new(AppState::new(catalog, config.api.recent_products_days));
    let router = routes::setup_routes(state.clone());

    Ok((state, router))
}
