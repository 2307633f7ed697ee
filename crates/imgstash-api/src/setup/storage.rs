//! Storage setup and initialization

use anyhow::{Context, Result};
use imgstash_core::Config;
use imgstash_storage::{BlobStorage, LocalStorage, WatermarkSlot};
use std::sync::Arc;

/// Image blob area and the watermark slot, each in its own directory.
pub async fn setup_storage(config: &Config) -> Result<(Arc<dyn BlobStorage>, Arc<WatermarkSlot>)> {
    tracing::info!("Initializing storage...");

    let images = LocalStorage::new(&config.images_dir)
        .await
        .with_context(|| format!("Failed to prepare {}", config.images_dir.display()))?;
    let watermarks = LocalStorage::new(&config.watermarks_dir)
        .await
        .with_context(|| format!("Failed to prepare {}", config.watermarks_dir.display()))?;

    tracing::info!(
        images_dir = %config.images_dir.display(),
        watermarks_dir = %config.watermarks_dir.display(),
        "Storage initialized"
    );

    let watermark = WatermarkSlot::new(Arc::new(watermarks));
    Ok((Arc::new(images), Arc::new(watermark)))
}
