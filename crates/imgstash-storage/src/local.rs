use crate::traits::{BlobStorage, BlobStream, StorageError, StorageResult};
use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Filesystem blob storage rooted at a single flat directory
#[derive(Clone, Debug)]
pub struct LocalStorage {
    base_path: PathBuf,
}

impl LocalStorage {
    /// Create a new LocalStorage instance, creating `base_path` if needed
    pub async fn new(base_path: impl Into<PathBuf>) -> StorageResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(LocalStorage { base_path })
    }

    /// Map a blob name to its file, rejecting anything that could leave the
    /// storage directory.
    fn name_to_path(&self, name: &str) -> StorageResult<PathBuf> {
        if name.is_empty() {
            return Err(StorageError::InvalidKey("Blob name is empty".to_string()));
        }

        if name.contains("..")
            || name.starts_with('/')
            || name.contains('/')
            || name.contains('\\')
            || name.contains('\0')
        {
            return Err(StorageError::InvalidKey(
                "Blob name contains invalid characters".to_string(),
            ));
        }

        Ok(self.base_path.join(name))
    }

    async fn write_file(path: &Path, data: &[u8]) -> StorageResult<()> {
        let mut file = fs::File::create(path).await.map_err(|e| {
            StorageError::WriteFailed(format!("Failed to create file {}: {}", path.display(), e))
        })?;

        file.write_all(data).await.map_err(|e| {
            StorageError::WriteFailed(format!("Failed to write file {}: {}", path.display(), e))
        })?;

        file.sync_all().await.map_err(|e| {
            StorageError::WriteFailed(format!("Failed to sync file {}: {}", path.display(), e))
        })?;

        Ok(())
    }
}

#[async_trait]
impl BlobStorage for LocalStorage {
    async fn write(&self, name: &str, data: Bytes) -> StorageResult<u64> {
        let path = self.name_to_path(name)?;
        let size = data.len() as u64;
        let start = Instant::now();

        Self::write_file(&path, &data).await?;

        tracing::info!(
            path = %path.display(),
            key = %name,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage write successful"
        );

        Ok(size)
    }

    async fn read(&self, name: &str) -> StorageResult<Vec<u8>> {
        let path = self.name_to_path(name)?;
        let start = Instant::now();

        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Err(StorageError::NotFound(name.to_string()));
        }

        let data = fs::read(&path).await.map_err(|e| {
            StorageError::ReadFailed(format!("Failed to read file {}: {}", path.display(), e))
        })?;

        tracing::debug!(
            path = %path.display(),
            key = %name,
            size_bytes = data.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage read successful"
        );

        Ok(data)
    }

    async fn read_stream(&self, name: &str) -> StorageResult<BlobStream> {
        let path = self.name_to_path(name)?;

        let file = match fs::File::open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StorageError::NotFound(name.to_string()));
            }
            Err(e) => {
                return Err(StorageError::ReadFailed(format!(
                    "Failed to open file {}: {}",
                    path.display(),
                    e
                )));
            }
        };

        let key = name.to_string();
        let stream = tokio_util::io::ReaderStream::new(file).map(move |result| {
            result.map_err(|e| {
                tracing::error!(key = %key, error = %e, "Local storage stream read error");
                StorageError::ReadFailed(format!("Failed to read chunk: {}", e))
            })
        });

        Ok(Box::pin(stream))
    }

    async fn delete(&self, name: &str) -> StorageResult<()> {
        let path = self.name_to_path(name)?;

        match fs::remove_file(&path).await {
            Ok(()) => {
                tracing::info!(path = %path.display(), key = %name, "Local storage delete successful");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::DeleteFailed(format!(
                "Failed to delete file {}: {}",
                path.display(),
                e
            ))),
        }
    }

    async fn rename(&self, from: &str, to: &str) -> StorageResult<()> {
        let from_path = self.name_to_path(from)?;
        let to_path = self.name_to_path(to)?;

        if !fs::try_exists(&from_path).await.unwrap_or(false) {
            return Err(StorageError::NotFound(from.to_string()));
        }

        fs::rename(&from_path, &to_path).await.map_err(|e| {
            StorageError::RenameFailed(format!(
                "Failed to rename {} to {}: {}",
                from_path.display(),
                to_path.display(),
                e
            ))
        })?;

        tracing::info!(from_key = %from, to_key = %to, "Local storage rename successful");

        Ok(())
    }

    async fn exists(&self, name: &str) -> StorageResult<bool> {
        let path = self.name_to_path(name)?;
        Ok(fs::try_exists(&path).await.unwrap_or(false))
    }

    async fn size(&self, name: &str) -> StorageResult<u64> {
        let path = self.name_to_path(name)?;
        match fs::metadata(&path).await {
            Ok(meta) => Ok(meta.len()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(name.to_string()))
            }
            Err(e) => Err(StorageError::IoError(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_write_read_size() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();

        let written = storage.write("a.png", Bytes::from_static(b"test data")).await.unwrap();
        assert_eq!(written, 9);
        assert_eq!(storage.read("a.png").await.unwrap(), b"test data");
        assert_eq!(storage.size("a.png").await.unwrap(), 9);
        assert!(storage.exists("a.png").await.unwrap());
    }

    #[tokio::test]
    async fn test_creates_missing_directory() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("images");
        let storage = LocalStorage::new(&nested).await.unwrap();
        assert!(nested.is_dir());
        storage.write("a.png", Bytes::from_static(b"x")).await.unwrap();
        assert!(nested.join("a.png").is_file());
    }

    #[tokio::test]
    async fn test_path_traversal_rejected() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();

        let result = storage.read("../../../etc/passwd").await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));

        let result = storage.delete("../etc/passwd").await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));

        let result = storage.write("nested/a.png", Bytes::from_static(b"x")).await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));

        let result = storage.exists("").await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));
    }

    #[tokio::test]
    async fn test_missing_blob() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();

        assert!(matches!(
            storage.read("missing.png").await,
            Err(StorageError::NotFound(_))
        ));
        assert!(matches!(
            storage.size("missing.png").await,
            Err(StorageError::NotFound(_))
        ));
        assert!(matches!(
            storage.read_stream("missing.png").await,
            Err(StorageError::NotFound(_))
        ));
        assert!(!storage.exists("missing.png").await.unwrap());
        // deleting nothing is fine
        storage.delete("missing.png").await.unwrap();
    }

    #[tokio::test]
    async fn test_rename_replaces_target() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();

        storage.write("tmp-a.png", Bytes::from_static(b"new")).await.unwrap();
        storage.write("a.png", Bytes::from_static(b"old")).await.unwrap();
        storage.rename("tmp-a.png", "a.png").await.unwrap();

        assert_eq!(storage.read("a.png").await.unwrap(), b"new");
        assert!(!storage.exists("tmp-a.png").await.unwrap());
    }

    #[tokio::test]
    async fn test_read_stream_yields_contents() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();
        let data: Vec<u8> = (0..20_000u32).map(|i| (i % 251) as u8).collect();
        storage.write("big.gif", Bytes::from(data.clone())).await.unwrap();

        let mut stream = storage.read_stream("big.gif").await.unwrap();
        let mut collected = Vec::new();
        while let Some(chunk) = stream.next().await {
            collected.extend_from_slice(&chunk.unwrap());
        }
        assert_eq!(collected, data);
    }
}
