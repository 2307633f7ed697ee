//! Storage abstraction trait
//!
//! This module defines the BlobStorage trait that all storage backends must implement.

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use imgstash_core::AppError;
use std::pin::Pin;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Write failed: {0}")]
    WriteFailed(String),

    #[error("Read failed: {0}")]
    ReadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("Rename failed: {0}")]
    RenameFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid blob name: {0}")]
    InvalidKey(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Chunked blob contents, as produced by [`BlobStorage::read_stream`].
pub type BlobStream = Pin<Box<dyn Stream<Item = Result<Bytes, StorageError>> + Send>>;

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(name) => AppError::NotFound(format!("Blob not found: {}", name)),
            StorageError::InvalidKey(msg) => AppError::InvalidInput(msg),
            other => AppError::Storage(other.to_string()),
        }
    }
}

/// Storage abstraction trait
///
/// The lifecycle service only talks to this trait, so a backend can be swapped
/// without touching the record rules. All names are bare filenames.
#[async_trait]
pub trait BlobStorage: Send + Sync {
    /// Write (or overwrite) a blob and return its byte length
    async fn write(&self, name: &str, data: Bytes) -> StorageResult<u64>;

    /// Read a whole blob
    async fn read(&self, name: &str) -> StorageResult<Vec<u8>>;

    /// Read a blob as a stream of chunks
    async fn read_stream(&self, name: &str) -> StorageResult<BlobStream>;

    /// Delete a blob; deleting a missing blob succeeds
    async fn delete(&self, name: &str) -> StorageResult<()>;

    /// Rename a blob, replacing any blob already at `to`
    async fn rename(&self, from: &str, to: &str) -> StorageResult<()>;

    /// Check if a blob exists
    async fn exists(&self, name: &str) -> StorageResult<bool>;

    /// Byte length of an existing blob
    async fn size(&self, name: &str) -> StorageResult<u64>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_maps_to_not_found() {
        let err: AppError = StorageError::NotFound("a.png".to_string()).into();
        match err {
            AppError::NotFound(msg) => assert!(msg.contains("a.png")),
            other => panic!("Expected NotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_key_maps_to_invalid_input() {
        let err: AppError = StorageError::InvalidKey("../etc".to_string()).into();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    #[test]
    fn test_io_error_maps_to_storage() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: AppError = StorageError::IoError(io_err).into();
        assert!(matches!(err, AppError::Storage(_)));
    }
}
