//! Imgstash Processing Library
//!
//! Synchronous image decoding, resizing, format conversion and watermark
//! compositing over in-memory byte buffers. Callers on an async runtime should
//! run these functions inside `tokio::task::spawn_blocking`.

pub mod error;
pub mod image;
pub mod metadata;

pub use error::ProcessingError;
pub use crate::image::{ImageProcessor, ImageTransformer, Watermark};
pub use metadata::ImageMetadata;
