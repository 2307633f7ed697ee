//! Image processor - format detection and metadata extraction

use crate::error::ProcessingError;
use crate::metadata::ImageMetadata;
use image::{GenericImageView, ImageFormat, ImageReader};
use imgstash_core::ImageKind;
use std::io::Cursor;

pub struct ImageProcessor;

impl ImageProcessor {
    /// Decode `data` and report its format and dimensions.
    pub fn extract_metadata(data: &[u8]) -> Result<ImageMetadata, ProcessingError> {
        let reader = ImageReader::new(Cursor::new(data))
            .with_guessed_format()
            .map_err(|e| ProcessingError::Decode(e.to_string()))?;

        let format = reader
            .format()
            .ok_or_else(|| ProcessingError::Decode("unrecognized image data".to_string()))?;
        let kind = Self::kind_from_format(format)
            .ok_or_else(|| ProcessingError::UnsupportedFormat(format!("{:?}", format)))?;

        let img = reader
            .decode()
            .map_err(|e| ProcessingError::Decode(e.to_string()))?;
        let (width, height) = img.dimensions();

        Ok(ImageMetadata {
            kind,
            width,
            height,
            size_bytes: data.len() as u64,
        })
    }

    /// Sniff the format from magic bytes without decoding.
    pub fn detect_kind(data: &[u8]) -> Option<ImageKind> {
        image::guess_format(data)
            .ok()
            .and_then(Self::kind_from_format)
    }

    pub fn kind_from_format(format: ImageFormat) -> Option<ImageKind> {
        match format {
            ImageFormat::Png => Some(ImageKind::Png),
            ImageFormat::Jpeg => Some(ImageKind::Jpeg),
            ImageFormat::WebP => Some(ImageKind::WebP),
            ImageFormat::Gif => Some(ImageKind::Gif),
            _ => None,
        }
    }

    pub fn format_for(kind: ImageKind) -> ImageFormat {
        match kind {
            ImageKind::Png => ImageFormat::Png,
            ImageKind::Jpeg => ImageFormat::Jpeg,
            ImageKind::WebP => ImageFormat::WebP,
            ImageKind::Gif => ImageFormat::Gif,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, Rgba([10, 20, 30, 255]));
        let mut buffer = Cursor::new(Vec::new());
        img.write_to(&mut buffer, ImageFormat::Png).unwrap();
        buffer.into_inner()
    }

    #[test]
    fn test_extract_metadata_png() {
        let data = png(100, 60);
        let meta = ImageProcessor::extract_metadata(&data).unwrap();
        assert_eq!(meta.kind, ImageKind::Png);
        assert_eq!((meta.width, meta.height), (100, 60));
        assert_eq!(meta.size_bytes, data.len() as u64);
    }

    #[test]
    fn test_extract_metadata_rejects_garbage() {
        let result = ImageProcessor::extract_metadata(b"definitely not an image");
        assert!(matches!(result, Err(ProcessingError::Decode(_))));
    }

    #[test]
    fn test_extract_metadata_rejects_truncated_png() {
        let data = png(32, 32);
        let result = ImageProcessor::extract_metadata(&data[..data.len() / 2]);
        assert!(matches!(result, Err(ProcessingError::Decode(_))));
    }

    #[test]
    fn test_detect_kind() {
        assert_eq!(ImageProcessor::detect_kind(&png(2, 2)), Some(ImageKind::Png));
        assert_eq!(ImageProcessor::detect_kind(b"plain text"), None);
    }

    #[test]
    fn test_format_mapping_is_symmetric() {
        for kind in ImageKind::ALL {
            let format = ImageProcessor::format_for(kind);
            assert_eq!(ImageProcessor::kind_from_format(format), Some(kind));
        }
        assert_eq!(ImageProcessor::kind_from_format(ImageFormat::Bmp), None);
    }
}
