use async_trait::async_trait;
use imgstash_core::{merge_extra_types, AppError, ImageKind, ImageRecord, NewImageRecord};
use imgstash_storage::keys;
use uuid::Uuid;

/// Image record store.
///
/// Mutations return the updated record and fail with `AppError::NotFound`
/// when the id is unknown.
#[async_trait]
pub trait ImageRepository: Send + Sync {
    async fn create(&self, record: NewImageRecord) -> Result<ImageRecord, AppError>;

    async fn get(&self, id: Uuid) -> Result<Option<ImageRecord>, AppError>;

    /// Every record, oldest first.
    async fn list(&self) -> Result<Vec<ImageRecord>, AppError>;

    async fn set_path(&self, id: Uuid, path: &str) -> Result<ImageRecord, AppError>;

    /// Append to `extra_types`, skipping values already present.
    async fn append_extra_types(
        &self,
        id: Uuid,
        additions: &[String],
    ) -> Result<ImageRecord, AppError>;

    async fn update_format(
        &self,
        id: Uuid,
        image_type: &str,
        filename: &str,
        size: u64,
    ) -> Result<ImageRecord, AppError>;

    async fn update_dimensions(
        &self,
        id: Uuid,
        width: u32,
        height: u32,
        size: u64,
    ) -> Result<ImageRecord, AppError>;

    /// Normalize records written under older schemas. Returns the number of
    /// records changed.
    async fn backfill_legacy(&self) -> Result<u64, AppError>;
}

pub(crate) fn not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("Image {} not found", id))
}

/// Normalized form of a legacy record, or `None` when nothing changes.
///
/// A missing `type` is taken from the filename extension when it names a
/// known format; `extra_types` loses duplicates and empty entries.
pub(crate) fn normalize_legacy(record: &ImageRecord) -> Option<(Option<String>, Vec<String>)> {
    let image_type = match record.image_type.as_deref() {
        Some(t) if !t.is_empty() => Some(t.to_string()),
        _ => keys::extension(&record.filename)
            .and_then(ImageKind::parse)
            .map(|kind| kind.as_str().to_string()),
    };
    let extra_types = merge_extra_types(&record.extra_types, &[]);

    if image_type == record.image_type && extra_types == record.extra_types {
        None
    } else {
        Some((image_type, extra_types))
    }
}
