use imgstash_core::{AppError, ImageKind};
use thiserror::Error;

/// Errors raised while decoding, transforming or encoding images
#[derive(Debug, Error)]
pub enum ProcessingError {
    #[error("Failed to decode image: {0}")]
    Decode(String),

    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid dimensions {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("Watermark {overlay_width}x{overlay_height} does not fit into a {width}x{height} image")]
    WatermarkTooLarge {
        overlay_width: u32,
        overlay_height: u32,
        width: u32,
        height: u32,
    },

    #[error("Failed to encode image as {kind}: {message}")]
    Encode { kind: ImageKind, message: String },
}

impl From<ProcessingError> for AppError {
    fn from(err: ProcessingError) -> Self {
        AppError::ImageProcessing(err.to_string())
    }
}
