//! Imgstash Storage Library
//!
//! Blob storage for image bytes: the [`BlobStorage`] trait, the filesystem
//! backend, the watermark slot and every rule for deriving blob names.
//!
//! # Blob names
//!
//! Blobs live in a flat area and are addressed by filename only. Names must not
//! contain `..`, path separators or a leading `/`. Name derivation is
//! centralized in the [`keys`] module so uploads and transforms stay consistent.

pub mod keys;
pub mod local;
pub mod traits;
pub mod watermark;

// Re-export commonly used types
pub use local::LocalStorage;
pub use traits::{BlobStorage, BlobStream, StorageError, StorageResult};
pub use watermark::{WatermarkGuard, WatermarkSlot, WATERMARK_FILENAME};
