//! The single watermark slot.
//!
//! At most one pending watermark exists. Uploading replaces it; the next
//! watermark edit consumes it. All access goes through one async mutex so a
//! replacement can never land between an edit reading the slot and deleting it.

use crate::traits::{BlobStorage, StorageError, StorageResult};
use bytes::Bytes;
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};

pub const WATERMARK_FILENAME: &str = "watermark.png";

pub struct WatermarkSlot {
    storage: Arc<dyn BlobStorage>,
    lock: Mutex<()>,
}

impl WatermarkSlot {
    pub fn new(storage: Arc<dyn BlobStorage>) -> Self {
        Self {
            storage,
            lock: Mutex::new(()),
        }
    }

    /// Store `data` as the pending watermark, replacing any previous one.
    pub async fn put(&self, data: Bytes) -> StorageResult<u64> {
        let _guard = self.lock.lock().await;
        let size = self.storage.write(WATERMARK_FILENAME, data).await?;
        tracing::info!(size_bytes = size, "Watermark slot replaced");
        Ok(size)
    }

    /// Lock the slot until the returned guard is dropped or consumed.
    pub async fn acquire(&self) -> WatermarkGuard<'_> {
        WatermarkGuard {
            storage: self.storage.as_ref(),
            _guard: self.lock.lock().await,
        }
    }
}

/// Exclusive access to the watermark slot.
pub struct WatermarkGuard<'a> {
    storage: &'a dyn BlobStorage,
    _guard: MutexGuard<'a, ()>,
}

impl WatermarkGuard<'_> {
    /// Current watermark bytes, or `None` when the slot is empty.
    pub async fn load(&self) -> StorageResult<Option<Vec<u8>>> {
        match self.storage.read(WATERMARK_FILENAME).await {
            Ok(data) => Ok(Some(data)),
            Err(StorageError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Empty the slot and release the lock.
    pub async fn consume(self) -> StorageResult<()> {
        self.storage.delete(WATERMARK_FILENAME).await?;
        tracing::info!("Watermark slot consumed");
        Ok(())
    }
}
