//! Image lifecycle: the rules that keep blobs and records consistent across
//! uploads and transforms.
//!
//! Keeps handler logic thin and allows unit testing without HTTP.

use bytes::Bytes;
use imgstash_core::{AppError, Config, ImageKind, ImageRecord, NewImageRecord};
use imgstash_db::ImageRepository;
use imgstash_processing::{ImageMetadata, ImageProcessor, ImageTransformer, ProcessingError};
use imgstash_storage::{keys, BlobStorage, BlobStream, StorageError, WatermarkSlot};
use std::sync::Arc;
use uuid::Uuid;

pub const IMAGE_NOT_FOUND: &str = "Image not found";
pub const FILE_NOT_FOUND: &str = "image file not found";

/// Parse a client-supplied id. Anything that is not a UUID cannot name a
/// record, so it is reported as not found.
pub fn parse_image_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw.trim()).map_err(|_| AppError::NotFound(IMAGE_NOT_FOUND.to_string()))
}

/// Run a CPU-bound image operation off the async runtime.
async fn run_blocking<T, F>(task: F) -> Result<T, AppError>
where
    F: FnOnce() -> Result<T, ProcessingError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| AppError::Internal(format!("Image task failed: {}", e)))?
        .map_err(AppError::from)
}

/// Service owning every image record and blob mutation.
#[derive(Clone)]
pub struct ImageLifecycleService {
    repository: Arc<dyn ImageRepository>,
    blobs: Arc<dyn BlobStorage>,
    watermark: Arc<WatermarkSlot>,
    config: Arc<Config>,
}

impl ImageLifecycleService {
    pub fn new(
        repository: Arc<dyn ImageRepository>,
        blobs: Arc<dyn BlobStorage>,
        watermark: Arc<WatermarkSlot>,
        config: Arc<Config>,
    ) -> Self {
        Self {
            repository,
            blobs,
            watermark,
            config,
        }
    }

    fn check_upload(&self, data: &Bytes) -> Result<(), AppError> {
        if data.is_empty() {
            return Err(AppError::InvalidInput("Uploaded file is empty".to_string()));
        }
        if data.len() > self.config.max_file_size_bytes {
            return Err(AppError::PayloadTooLarge(format!(
                "File exceeds the {} byte limit",
                self.config.max_file_size_bytes
            )));
        }
        Ok(())
    }

    /// Fetch a record or fail with "Image not found".
    pub async fn get(&self, id: Uuid) -> Result<ImageRecord, AppError> {
        self.repository
            .get(id)
            .await?
            .ok_or_else(|| AppError::NotFound(IMAGE_NOT_FOUND.to_string()))
    }

    pub async fn list(&self) -> Result<Vec<ImageRecord>, AppError> {
        self.repository.list().await
    }

    async fn read_blob(&self, name: &str) -> Result<Vec<u8>, AppError> {
        match self.blobs.read(name).await {
            Ok(data) => Ok(data),
            Err(StorageError::NotFound(_)) => Err(AppError::NotFound(FILE_NOT_FOUND.to_string())),
            Err(e) => Err(e.into()),
        }
    }

    /// Best-effort removal of a blob left behind by a failed operation.
    async fn discard(&self, name: &str) {
        if let Err(e) = self.blobs.delete(name).await {
            tracing::warn!(error = %e, key = %name, "Failed to remove intermediate blob");
        }
    }

    /// Create the record for a freshly written blob, then point its `path` at
    /// the record's own id.
    async fn register(&self, record: NewImageRecord) -> Result<ImageRecord, AppError> {
        let created = self.repository.create(record).await?;
        let path = self.config.image_path(created.id);
        self.repository.set_path(created.id, &path).await
    }

    /// Store an uploaded image and create its record.
    pub async fn upload(&self, original_name: &str, data: Bytes) -> Result<ImageRecord, AppError> {
        self.check_upload(&data)?;

        let filename = keys::upload_filename(original_name, ImageProcessor::detect_kind(&data));
        let size = self.blobs.write(&filename, data.clone()).await?;

        let metadata = match run_blocking(move || ImageProcessor::extract_metadata(&data)).await {
            Ok(metadata) => metadata,
            Err(e) => {
                self.discard(&filename).await;
                return Err(e);
            }
        };

        let record = self
            .register(NewImageRecord::new(
                filename,
                metadata.kind,
                size,
                metadata.width,
                metadata.height,
            ))
            .await?;

        tracing::info!(
            image_id = %record.id,
            filename = %record.filename,
            width = record.width,
            height = record.height,
            size_bytes = size,
            "Image uploaded"
        );

        Ok(record)
    }

    /// Replace the pending watermark. The slot is always stored as
    /// `watermark.png`, so only PNG payloads are accepted.
    pub async fn upload_watermark(&self, data: Bytes) -> Result<(), AppError> {
        self.check_upload(&data)?;
        if ImageProcessor::detect_kind(&data) != Some(ImageKind::Png) {
            return Err(AppError::InvalidInput(
                "Watermark must be a PNG image".to_string(),
            ));
        }
        self.watermark.put(data).await?;
        Ok(())
    }

    /// Derive a resized (and, if a watermark is pending, watermarked) copy of
    /// a record as a new record.
    ///
    /// The current extension and the requested type are appended to the
    /// source record's `extra_types` before anything else happens, and that
    /// append is kept even if the transform fails.
    pub async fn apply_watermark_and_edit(
        &self,
        id: Uuid,
        width: u32,
        height: u32,
        requested_type: Option<&str>,
    ) -> Result<ImageRecord, AppError> {
        let original = self.get(id).await?;

        let requested_type = requested_type.map(str::trim).filter(|t| !t.is_empty());
        let additions: Vec<String> = keys::extension(&original.filename)
            .into_iter()
            .chain(requested_type)
            .map(str::to_string)
            .collect();
        self.repository.append_extra_types(id, &additions).await?;

        let kind = match requested_type {
            Some(t) => ImageKind::parse(t).ok_or_else(|| {
                AppError::ImageProcessing(format!("Unsupported output type: {}", t))
            })?,
            None => {
                return Err(AppError::ImageProcessing(
                    "Output type is required".to_string(),
                ))
            }
        };

        let source = self.read_blob(&original.filename).await?;

        let slot = self.watermark.acquire().await;
        let overlay = slot.load().await?;
        let watermarked = overlay.is_some();

        let (filename, output) = match overlay {
            None => {
                let filename = keys::resized_filename(&original.filename, kind);
                let output =
                    run_blocking(move || ImageTransformer::resize(&source, width, height, kind))
                        .await?;
                (filename, output)
            }
            Some(overlay) => {
                let filename =
                    keys::watermarked_filename(&original.filename, original.image_type.as_deref());
                let output = run_blocking(move || {
                    ImageTransformer::resize_with_watermark(&source, width, height, &overlay, kind)
                })
                .await?;
                (filename, output)
            }
        };

        let output = Bytes::from(output);
        self.blobs.write(&filename, output.clone()).await?;

        if watermarked {
            slot.consume().await?;
        } else {
            drop(slot);
        }

        let metadata: ImageMetadata =
            run_blocking(move || ImageProcessor::extract_metadata(&output)).await?;
        let size = self.blobs.size(&filename).await?;

        let record = self
            .register(NewImageRecord::new(
                filename,
                kind,
                size,
                metadata.width,
                metadata.height,
            ))
            .await?;

        tracing::info!(
            source_id = %id,
            image_id = %record.id,
            filename = %record.filename,
            watermarked,
            "Derived image created"
        );

        Ok(record)
    }

    /// Re-encode a record's blob in another format, updating the record in
    /// place.
    pub async fn convert_type(&self, id: Uuid, new_type: &str) -> Result<ImageRecord, AppError> {
        let record = self.get(id).await?;
        let kind = ImageKind::parse(new_type)
            .ok_or_else(|| AppError::InvalidInput(format!("Unsupported image type: {}", new_type)))?;

        let source = self.read_blob(&record.filename).await?;
        let output = run_blocking(move || ImageTransformer::convert(&source, kind)).await?;

        let new_filename = keys::converted_filename(&record.filename, kind);
        let temp = keys::temp_filename(&new_filename);

        let size = self.blobs.write(&temp, Bytes::from(output)).await?;
        if let Err(e) = self.blobs.rename(&temp, &new_filename).await {
            self.discard(&temp).await;
            return Err(e.into());
        }

        let updated = self
            .repository
            .update_format(id, kind.as_str(), &new_filename, size)
            .await?;

        if new_filename != record.filename {
            self.blobs.delete(&record.filename).await?;
        }

        tracing::info!(
            image_id = %id,
            from = %record.filename,
            to = %updated.filename,
            "Image type converted"
        );

        Ok(updated)
    }

    /// Resize a record's blob in place, keeping its filename and encoding.
    ///
    /// The record stores the requested dimensions; `size` and `type` come from
    /// the new blob. The temporary blob never outlives the call.
    pub async fn change_size(&self, id: Uuid, width: u32, height: u32) -> Result<ImageRecord, AppError> {
        let record = self.get(id).await?;
        let source = self.read_blob(&record.filename).await?;

        // Keep the stored encoding; the filename extension may disagree with it.
        let kind = record
            .image_type
            .as_deref()
            .and_then(ImageKind::parse)
            .or_else(|| ImageProcessor::detect_kind(&source))
            .or_else(|| keys::extension(&record.filename).and_then(ImageKind::parse))
            .ok_or_else(|| {
                AppError::ImageProcessing(format!(
                    "Cannot determine the format of {}",
                    record.filename
                ))
            })?;

        let output = run_blocking(move || ImageTransformer::resize(&source, width, height, kind)).await?;

        let temp = keys::temp_filename(&record.filename);
        let size = match self.blobs.write(&temp, Bytes::from(output)).await {
            Ok(size) => size,
            Err(e) => {
                self.discard(&temp).await;
                return Err(e.into());
            }
        };

        if let Err(e) = self.blobs.rename(&temp, &record.filename).await {
            self.discard(&temp).await;
            return Err(e.into());
        }

        let mut updated = self
            .repository
            .update_dimensions(id, width, height, size)
            .await?;
        if updated.image_type.as_deref() != Some(kind.as_str()) {
            updated = self
                .repository
                .update_format(id, kind.as_str(), &record.filename, size)
                .await?;
        }

        tracing::info!(image_id = %id, width, height, size_bytes = size, "Image resized");

        Ok(updated)
    }

    /// Record plus a stream over its blob.
    pub async fn open_blob(&self, id: Uuid) -> Result<(ImageRecord, BlobStream), AppError> {
        let record = self.get(id).await?;
        match self.blobs.read_stream(&record.filename).await {
            Ok(stream) => Ok((record, stream)),
            Err(StorageError::NotFound(_)) => Err(AppError::NotFound(FILE_NOT_FOUND.to_string())),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
    use imgstash_db::InMemoryImageRepository;
    use imgstash_storage::LocalStorage;
    use std::io::Cursor;
    use tempfile::TempDir;

    struct Fixture {
        service: ImageLifecycleService,
        images: TempDir,
        watermarks: TempDir,
    }

    fn config() -> Config {
        Config {
            server_port: 5000,
            database_url: "postgres://localhost/imgstash".to_string(),
            db_max_connections: 1,
            db_timeout_seconds: 1,
            images_dir: "./images".into(),
            watermarks_dir: "./watermarks".into(),
            public_base_url: "http://localhost:5000".to_string(),
            max_file_size_bytes: 1024 * 1024,
            cors_origins: vec!["*".to_string()],
            http_concurrency_limit: 8,
            environment: "test".to_string(),
        }
    }

    async fn fixture() -> Fixture {
        fixture_with(InMemoryImageRepository::new()).await
    }

    async fn fixture_with(repository: InMemoryImageRepository) -> Fixture {
        let images = tempfile::tempdir().unwrap();
        let watermarks = tempfile::tempdir().unwrap();
        let blobs: Arc<dyn BlobStorage> = Arc::new(LocalStorage::new(images.path()).await.unwrap());
        let wm_storage: Arc<dyn BlobStorage> =
            Arc::new(LocalStorage::new(watermarks.path()).await.unwrap());
        let service = ImageLifecycleService::new(
            Arc::new(repository),
            blobs,
            Arc::new(WatermarkSlot::new(wm_storage)),
            Arc::new(config()),
        );
        Fixture {
            service,
            images,
            watermarks,
        }
    }

    fn png(width: u32, height: u32) -> Bytes {
        let img = RgbaImage::from_pixel(width, height, Rgba([40, 80, 120, 255]));
        let mut buffer = Cursor::new(Vec::new());
        img.write_to(&mut buffer, ImageFormat::Png).unwrap();
        Bytes::from(buffer.into_inner())
    }

    fn jpeg(width: u32, height: u32) -> Bytes {
        let img = RgbImage::from_pixel(width, height, Rgb([200, 100, 50]));
        let mut buffer = Cursor::new(Vec::new());
        img.write_to(&mut buffer, ImageFormat::Jpeg).unwrap();
        Bytes::from(buffer.into_inner())
    }

    fn blob_names(dir: &TempDir) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_parse_image_id() {
        let id = Uuid::new_v4();
        assert_eq!(parse_image_id(&id.to_string()).unwrap(), id);
        assert!(matches!(
            parse_image_id("64f1c0ffee"),
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_upload_creates_record_with_path() {
        let fx = fixture().await;
        let record = fx.service.upload("cat.png", png(100, 100)).await.unwrap();

        assert_eq!(record.image_type.as_deref(), Some("png"));
        assert_eq!((record.width, record.height), (100, 100));
        assert!(record.filename.ends_with(".png"));
        assert!(record.extra_types.is_empty());
        assert_eq!(
            record.path.as_deref(),
            Some(format!("http://localhost:5000/image/{}", record.id).as_str())
        );
        assert_eq!(blob_names(&fx.images), vec![record.filename.clone()]);
    }

    #[tokio::test]
    async fn test_upload_garbage_leaves_no_blob() {
        let fx = fixture().await;
        let result = fx.service.upload("notes.png", Bytes::from_static(b"hello")).await;

        assert!(matches!(result, Err(AppError::ImageProcessing(_))));
        assert!(blob_names(&fx.images).is_empty());
        assert!(fx.service.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_upload_rejects_empty_and_oversized() {
        let fx = fixture().await;
        assert!(matches!(
            fx.service.upload("a.png", Bytes::new()).await,
            Err(AppError::InvalidInput(_))
        ));
        let big = Bytes::from(vec![0u8; 1024 * 1024 + 1]);
        assert!(matches!(
            fx.service.upload("a.png", big).await,
            Err(AppError::PayloadTooLarge(_))
        ));
    }

    #[tokio::test]
    async fn test_change_size_keeps_filename_and_cleans_temp() {
        let fx = fixture().await;
        let record = fx.service.upload("cat.png", png(100, 100)).await.unwrap();

        let updated = fx.service.change_size(record.id, 50, 40).await.unwrap();
        assert_eq!(updated.filename, record.filename);
        assert_eq!((updated.width, updated.height), (50, 40));

        let blob = std::fs::read(fx.images.path().join(&record.filename)).unwrap();
        assert_eq!(updated.size, blob.len().to_string());
        let meta = ImageProcessor::extract_metadata(&blob).unwrap();
        assert_eq!((meta.width, meta.height), (50, 40));
        assert_eq!(blob_names(&fx.images), vec![record.filename]);
    }

    #[tokio::test]
    async fn test_change_size_keeps_stored_type_over_extension() {
        let fx = fixture().await;
        let record = fx.service.upload("photo.jpg", png(20, 20)).await.unwrap();
        assert!(record.filename.ends_with(".jpg"));
        assert_eq!(record.image_type.as_deref(), Some("png"));

        let updated = fx.service.change_size(record.id, 10, 10).await.unwrap();
        assert_eq!(updated.image_type.as_deref(), Some("png"));

        let blob = std::fs::read(fx.images.path().join(&record.filename)).unwrap();
        let meta = ImageProcessor::extract_metadata(&blob).unwrap();
        assert_eq!(meta.kind, ImageKind::Png);
        assert_eq!((meta.width, meta.height), (10, 10));
    }

    #[tokio::test]
    async fn test_change_size_records_type_of_legacy_record() {
        let id = Uuid::new_v4();
        let legacy = ImageRecord {
            id,
            filename: "legacy.jpg".to_string(),
            path: None,
            image_type: None,
            size: "0".to_string(),
            width: 16,
            height: 16,
            extra_types: Vec::new(),
            tag: None,
        };
        let fx = fixture_with(InMemoryImageRepository::with_records(vec![legacy])).await;
        std::fs::write(fx.images.path().join("legacy.jpg"), png(16, 16)).unwrap();

        let updated = fx.service.change_size(id, 8, 8).await.unwrap();
        assert_eq!(updated.image_type.as_deref(), Some("png"));
        assert_eq!(updated.filename, "legacy.jpg");
        let blob = std::fs::read(fx.images.path().join("legacy.jpg")).unwrap();
        assert_eq!(
            ImageProcessor::extract_metadata(&blob).unwrap().kind,
            ImageKind::Png
        );
        assert_eq!(updated.size, blob.len().to_string());
    }

    #[tokio::test]
    async fn test_change_size_failure_leaves_original() {
        let fx = fixture().await;
        let record = fx.service.upload("cat.png", png(20, 20)).await.unwrap();

        let result = fx.service.change_size(record.id, 0, 10).await;
        assert!(result.is_err());
        assert_eq!(blob_names(&fx.images), vec![record.filename.clone()]);
        let unchanged = fx.service.get(record.id).await.unwrap();
        assert_eq!((unchanged.width, unchanged.height), (20, 20));
    }

    #[tokio::test]
    async fn test_convert_type_replaces_blob() {
        let fx = fixture().await;
        let record = fx.service.upload("cat.png", png(30, 30)).await.unwrap();

        let updated = fx.service.convert_type(record.id, "jpeg").await.unwrap();
        assert_eq!(updated.id, record.id);
        assert_eq!(updated.image_type.as_deref(), Some("jpeg"));
        assert!(updated.filename.ends_with(".jpeg"));
        assert_eq!(blob_names(&fx.images), vec![updated.filename.clone()]);

        let back = fx.service.convert_type(record.id, "png").await.unwrap();
        assert_eq!(back.filename, record.filename);
        let blob = std::fs::read(fx.images.path().join(&back.filename)).unwrap();
        assert_eq!(
            ImageProcessor::extract_metadata(&blob).unwrap().kind,
            ImageKind::Png
        );
    }

    #[tokio::test]
    async fn test_convert_type_same_format_keeps_single_blob() {
        let fx = fixture().await;
        let record = fx.service.upload("cat.png", png(8, 8)).await.unwrap();

        let updated = fx.service.convert_type(record.id, "png").await.unwrap();
        assert_eq!(updated.filename, record.filename);
        assert_eq!(blob_names(&fx.images), vec![record.filename]);
    }

    #[tokio::test]
    async fn test_apply_without_watermark_derives_resized_record() {
        let fx = fixture().await;
        let record = fx.service.upload("cat.png", png(100, 100)).await.unwrap();

        let derived = fx
            .service
            .apply_watermark_and_edit(record.id, 40, 30, Some("webp"))
            .await
            .unwrap();

        assert_ne!(derived.id, record.id);
        assert_eq!(
            derived.filename,
            format!("resized-{}.webp", keys::base_name(&record.filename))
        );
        assert_eq!(derived.image_type.as_deref(), Some("webp"));
        assert_eq!((derived.width, derived.height), (40, 30));
        assert!(derived.extra_types.is_empty());

        let source = fx.service.get(record.id).await.unwrap();
        assert_eq!(source.extra_types, vec!["png", "webp"]);
        assert_eq!(source.filename, record.filename);
    }

    #[tokio::test]
    async fn test_apply_with_watermark_consumes_slot() {
        let fx = fixture().await;
        let record = fx.service.upload("cat.png", png(100, 100)).await.unwrap();
        fx.service.upload_watermark(png(10, 10)).await.unwrap();

        let derived = fx
            .service
            .apply_watermark_and_edit(record.id, 50, 50, Some("jpeg"))
            .await
            .unwrap();

        // named after the stored type, encoded as the requested one
        assert_eq!(
            derived.filename,
            format!("watermarked-{}.png", keys::base_name(&record.filename))
        );
        assert_eq!(derived.image_type.as_deref(), Some("jpeg"));
        let blob = std::fs::read(fx.images.path().join(&derived.filename)).unwrap();
        assert_eq!(
            ImageProcessor::extract_metadata(&blob).unwrap().kind,
            ImageKind::Jpeg
        );
        assert!(blob_names(&fx.watermarks).is_empty());
    }

    #[tokio::test]
    async fn test_apply_failure_keeps_extra_types_and_watermark() {
        let fx = fixture().await;
        let record = fx.service.upload("cat.png", png(20, 20)).await.unwrap();
        fx.service.upload_watermark(png(40, 40)).await.unwrap();

        let result = fx
            .service
            .apply_watermark_and_edit(record.id, 10, 10, Some("png"))
            .await;
        assert!(matches!(result, Err(AppError::ImageProcessing(_))));

        let source = fx.service.get(record.id).await.unwrap();
        assert_eq!(source.extra_types, vec!["png"]);
        assert_eq!(blob_names(&fx.watermarks), vec!["watermark.png"]);
        assert_eq!(fx.service.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_upload_watermark_rejects_non_png() {
        let fx = fixture().await;
        fx.service.upload_watermark(png(10, 10)).await.unwrap();

        for data in [jpeg(10, 10), Bytes::from_static(b"not an image")] {
            match fx.service.upload_watermark(data).await {
                Err(AppError::InvalidInput(msg)) => {
                    assert_eq!(msg, "Watermark must be a PNG image")
                }
                other => panic!("unexpected result: {:?}", other),
            }
        }
        // The previously stored watermark is untouched.
        let stored = std::fs::read(fx.watermarks.path().join("watermark.png")).unwrap();
        assert_eq!(ImageProcessor::detect_kind(&stored), Some(ImageKind::Png));
    }

    #[tokio::test]
    async fn test_apply_without_type_appends_extension_only() {
        let fx = fixture().await;
        let record = fx.service.upload("cat.png", png(20, 20)).await.unwrap();

        let result = fx.service.apply_watermark_and_edit(record.id, 10, 10, None).await;
        assert!(matches!(result, Err(AppError::ImageProcessing(_))));
        assert_eq!(
            fx.service.get(record.id).await.unwrap().extra_types,
            vec!["png"]
        );
    }

    #[tokio::test]
    async fn test_missing_blob_is_not_found() {
        let fx = fixture().await;
        let record = fx.service.upload("cat.png", png(4, 4)).await.unwrap();
        std::fs::remove_file(fx.images.path().join(&record.filename)).unwrap();

        match fx.service.open_blob(record.id).await {
            Err(AppError::NotFound(msg)) => assert_eq!(msg, FILE_NOT_FOUND),
            Err(other) => panic!("unexpected error: {:?}", other),
            Ok(_) => panic!("expected missing blob"),
        }
        assert!(matches!(
            fx.service.change_size(record.id, 2, 2).await,
            Err(AppError::NotFound(_))
        ));
    }
}
