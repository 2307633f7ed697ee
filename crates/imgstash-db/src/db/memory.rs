use super::images::{normalize_legacy, not_found, ImageRepository};
use async_trait::async_trait;
use imgstash_core::{merge_extra_types, AppError, ImageRecord, NewImageRecord};
use tokio::sync::RwLock;
use uuid::Uuid;

/// Process-local image repository. Records are kept in creation order.
#[derive(Default)]
pub struct InMemoryImageRepository {
    records: RwLock<Vec<ImageRecord>>,
}

impl InMemoryImageRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed with existing records, e.g. rows written under an older schema.
    pub fn with_records(records: Vec<ImageRecord>) -> Self {
        Self {
            records: RwLock::new(records),
        }
    }

    async fn update<F>(&self, id: Uuid, apply: F) -> Result<ImageRecord, AppError>
    where
        F: FnOnce(&mut ImageRecord) + Send,
    {
        let mut records = self.records.write().await;
        let record = records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| not_found(id))?;
        apply(record);
        Ok(record.clone())
    }
}

#[async_trait]
impl ImageRepository for InMemoryImageRepository {
    async fn create(&self, record: NewImageRecord) -> Result<ImageRecord, AppError> {
        let created = record.into_record(Uuid::new_v4());
        self.records.write().await.push(created.clone());
        Ok(created)
    }

    async fn get(&self, id: Uuid) -> Result<Option<ImageRecord>, AppError> {
        let records = self.records.read().await;
        Ok(records.iter().find(|r| r.id == id).cloned())
    }

    async fn list(&self) -> Result<Vec<ImageRecord>, AppError> {
        Ok(self.records.read().await.clone())
    }

    async fn set_path(&self, id: Uuid, path: &str) -> Result<ImageRecord, AppError> {
        let path = path.to_string();
        self.update(id, move |r| r.path = Some(path)).await
    }

    async fn append_extra_types(
        &self,
        id: Uuid,
        additions: &[String],
    ) -> Result<ImageRecord, AppError> {
        self.update(id, |r| {
            r.extra_types = merge_extra_types(&r.extra_types, additions);
        })
        .await
    }

    async fn update_format(
        &self,
        id: Uuid,
        image_type: &str,
        filename: &str,
        size: u64,
    ) -> Result<ImageRecord, AppError> {
        self.update(id, |r| {
            r.image_type = Some(image_type.to_string());
            r.filename = filename.to_string();
            r.size = size.to_string();
        })
        .await
    }

    async fn update_dimensions(
        &self,
        id: Uuid,
        width: u32,
        height: u32,
        size: u64,
    ) -> Result<ImageRecord, AppError> {
        self.update(id, |r| {
            r.width = width;
            r.height = height;
            r.size = size.to_string();
        })
        .await
    }

    async fn backfill_legacy(&self) -> Result<u64, AppError> {
        let mut records = self.records.write().await;
        let mut changed = 0u64;

        for record in records.iter_mut() {
            if let Some((image_type, extra_types)) = normalize_legacy(record) {
                record.image_type = image_type;
                record.extra_types = extra_types;
                changed += 1;
            }
        }

        Ok(changed)
    }
}
