//! Application setup and initialization
//!
//! Initialization logic lives here instead of main.rs so each concern stays
//! small and testable.

pub mod database;
pub mod routes;
pub mod server;
pub mod storage;

use std::sync::Arc;

use anyhow::{Context, Result};
use leadmag_core::Config;
use leadmag_db::{PgDocumentRepository, PgLeadRepository};

use crate::state::AppState;

/// Initialize the entire application
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    config
        .validate()
        .context("Configuration validation failed")?;

    let pool = database::setup_database(&config).await?;
    let storage = storage::setup_storage(&config).await?;

    let state = Arc::new(AppState::new(
        config.clone(),
        storage,
        Arc::new(PgDocumentRepository::new(pool.clone())),
        Arc::new(PgLeadRepository::new(pool)),
    ));

    let router = routes::setup_routes(&config, state.clone())?;

    Ok((state, router))
}
