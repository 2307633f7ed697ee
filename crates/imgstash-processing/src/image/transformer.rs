//! Image transformer - resize, convert and resize-with-watermark
//!
//! Every entry point decodes the input, applies its operation and encodes the
//! result in the requested [`ImageKind`].

use crate::error::ProcessingError;
use crate::image::processor::ImageProcessor;
use crate::image::watermark::Watermark;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageReader};
use imgstash_core::ImageKind;
use std::io::Cursor;

pub struct ImageTransformer;

impl ImageTransformer {
    /// Cover-fit `data` to exactly `width`x`height` and encode as `kind`.
    pub fn resize(
        data: &[u8],
        width: u32,
        height: u32,
        kind: ImageKind,
    ) -> Result<Vec<u8>, ProcessingError> {
        Self::check_dimensions(width, height)?;
        let img = Self::decode(data)?;
        let resized = Self::cover(&img, width, height);
        Self::encode(resized, kind)
    }

    /// Re-encode `data` as `kind`.
    pub fn convert(data: &[u8], kind: ImageKind) -> Result<Vec<u8>, ProcessingError> {
        let img = Self::decode(data)?;
        Self::encode(img, kind)
    }

    /// Cover-fit to `width`x`height`, composite `overlay` in the bottom-right
    /// corner and encode as `kind`.
    pub fn resize_with_watermark(
        data: &[u8],
        width: u32,
        height: u32,
        overlay: &[u8],
        kind: ImageKind,
    ) -> Result<Vec<u8>, ProcessingError> {
        Self::check_dimensions(width, height)?;
        let img = Self::decode(data)?;
        let resized = Self::cover(&img, width, height);
        let composed = Watermark::apply_bottom_right(resized, overlay)?;
        Self::encode(composed, kind)
    }

    fn check_dimensions(width: u32, height: u32) -> Result<(), ProcessingError> {
        if width == 0 || height == 0 {
            return Err(ProcessingError::InvalidDimensions { width, height });
        }
        Ok(())
    }

    fn decode(data: &[u8]) -> Result<DynamicImage, ProcessingError> {
        ImageReader::new(Cursor::new(data))
            .with_guessed_format()
            .map_err(|e| ProcessingError::Decode(e.to_string()))?
            .decode()
            .map_err(|e| ProcessingError::Decode(e.to_string()))
    }

    /// Scale to cover the target box, then center-crop to it.
    fn cover(img: &DynamicImage, width: u32, height: u32) -> DynamicImage {
        if img.dimensions() == (width, height) {
            return img.clone();
        }
        img.resize_to_fill(width, height, FilterType::Lanczos3)
    }

    fn encode(img: DynamicImage, kind: ImageKind) -> Result<Vec<u8>, ProcessingError> {
        // JPEG has no alpha channel; WebP and GIF encoders take 8-bit RGBA.
        let img = match kind {
            ImageKind::Jpeg => DynamicImage::ImageRgb8(img.to_rgb8()),
            ImageKind::WebP | ImageKind::Gif => DynamicImage::ImageRgba8(img.to_rgba8()),
            ImageKind::Png => img,
        };

        let (width, height) = img.dimensions();
        let mut buffer = Cursor::new(Vec::with_capacity(width as usize * height as usize * 3));
        img.write_to(&mut buffer, ImageProcessor::format_for(kind))
            .map_err(|e| ProcessingError::Encode {
                kind,
                message: e.to_string(),
            })?;

        tracing::debug!(
            format = %kind,
            width,
            height,
            size_bytes = buffer.get_ref().len(),
            "Image encoded"
        );

        Ok(buffer.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgba, RgbaImage};

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_fn(width, height, |x, y| {
            Rgba([(x % 256) as u8, (y % 256) as u8, 128, 200])
        });
        let mut buffer = Cursor::new(Vec::new());
        img.write_to(&mut buffer, ImageFormat::Png).unwrap();
        buffer.into_inner()
    }

    fn watermark(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, Rgba([255, 0, 0, 255]));
        let mut buffer = Cursor::new(Vec::new());
        img.write_to(&mut buffer, ImageFormat::Png).unwrap();
        buffer.into_inner()
    }

    #[test]
    fn test_resize_produces_exact_dimensions() {
        let out = ImageTransformer::resize(&png(100, 100), 50, 50, ImageKind::Png).unwrap();
        let meta = ImageProcessor::extract_metadata(&out).unwrap();
        assert_eq!((meta.width, meta.height), (50, 50));
        assert_eq!(meta.kind, ImageKind::Png);
    }

    #[test]
    fn test_resize_cover_changes_aspect_ratio() {
        let out = ImageTransformer::resize(&png(200, 100), 40, 80, ImageKind::WebP).unwrap();
        let meta = ImageProcessor::extract_metadata(&out).unwrap();
        assert_eq!((meta.width, meta.height), (40, 80));
        assert_eq!(meta.kind, ImageKind::WebP);
    }

    #[test]
    fn test_resize_rejects_zero() {
        let result = ImageTransformer::resize(&png(10, 10), 0, 10, ImageKind::Png);
        assert!(matches!(
            result,
            Err(ProcessingError::InvalidDimensions { width: 0, height: 10 })
        ));
    }

    #[test]
    fn test_convert_every_kind() {
        let source = png(16, 12);
        for kind in ImageKind::ALL {
            let out = ImageTransformer::convert(&source, kind).unwrap();
            let meta = ImageProcessor::extract_metadata(&out).unwrap();
            assert_eq!(meta.kind, kind);
            assert_eq!((meta.width, meta.height), (16, 12));
        }
    }

    #[test]
    fn test_convert_rejects_garbage() {
        let result = ImageTransformer::convert(b"junk", ImageKind::Png);
        assert!(matches!(result, Err(ProcessingError::Decode(_))));
    }

    #[test]
    fn test_resize_with_watermark() {
        let out = ImageTransformer::resize_with_watermark(
            &png(120, 90),
            60,
            40,
            &watermark(10, 10),
            ImageKind::Png,
        )
        .unwrap();

        let img = image::load_from_memory(&out).unwrap();
        assert_eq!(img.dimensions(), (60, 40));
        assert_eq!(img.get_pixel(59, 39), Rgba([255, 0, 0, 255]));
        assert_eq!(img.get_pixel(50, 30), Rgba([255, 0, 0, 255]));
    }

    #[test]
    fn test_resize_with_watermark_too_large() {
        let result = ImageTransformer::resize_with_watermark(
            &png(120, 90),
            20,
            20,
            &watermark(30, 5),
            ImageKind::Jpeg,
        );
        assert!(matches!(result, Err(ProcessingError::WatermarkTooLarge { .. })));
    }
}
