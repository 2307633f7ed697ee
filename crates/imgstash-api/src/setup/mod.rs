//! Application setup and initialization

pub mod database;
pub mod routes;
pub mod server;
pub mod storage;

use crate::services::ImageLifecycleService;
use crate::state::AppState;
use anyhow::{Context, Result};
use imgstash_core::Config;
use imgstash_db::{ImageRepository, PgImageRepository};
use imgstash_storage::{BlobStorage, WatermarkSlot};
use std::sync::Arc;

/// Wire the lifecycle service and state from already-built parts.
pub fn build_state(
    config: Arc<Config>,
    repository: Arc<dyn ImageRepository>,
    blobs: Arc<dyn BlobStorage>,
    watermark: Arc<WatermarkSlot>,
) -> Arc<AppState> {
    let images = ImageLifecycleService::new(repository, blobs, watermark, config);
    AppState::new(images)
}

/// Initialize the entire application
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    // Validate configuration first - fail fast on misconfiguration
    config.validate().context("Configuration validation failed")?;

    crate::telemetry::init_telemetry(config.is_production())
        .map_err(|e| anyhow::anyhow!("Failed to initialize telemetry: {}", e))?;

    tracing::info!(
        environment = %config.environment,
        "Configuration loaded and validated successfully"
    );

    let database = database::setup_database(&config).await?;
    let repository = Arc::new(PgImageRepository::new(database.pool));

    let ready = database.connected
        && match database::prepare_schema(&repository).await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(error = ?e, "Schema preparation failed; continuing in degraded mode");
                false
            }
        };
    if !ready {
        tracing::warn!("Retrying migrations and legacy back-fill in the background");
        database::spawn_recovery(repository.clone());
    }

    let (blobs, watermark) = storage::setup_storage(&config).await?;

    let config = Arc::new(config);
    let state = build_state(config.clone(), repository, blobs, watermark);

    let router = routes::setup_routes(&config, state.clone())?;

    Ok((state, router))
}
