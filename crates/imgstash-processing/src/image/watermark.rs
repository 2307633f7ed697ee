use crate::error::ProcessingError;
use image::{imageops, DynamicImage, GenericImageView, ImageReader};
use std::io::Cursor;

pub struct Watermark;

impl Watermark {
    /// Alpha-composite `overlay_data` onto `img` with the overlay's bottom-right
    /// corner on the image's bottom-right corner. The overlay is drawn at its
    /// native size and must fit inside the image.
    pub fn apply_bottom_right(
        img: DynamicImage,
        overlay_data: &[u8],
    ) -> Result<DynamicImage, ProcessingError> {
        let overlay = ImageReader::new(Cursor::new(overlay_data))
            .with_guessed_format()
            .map_err(|e| ProcessingError::Decode(e.to_string()))?
            .decode()
            .map_err(|e| ProcessingError::Decode(format!("watermark: {}", e)))?
            .to_rgba8();

        let (width, height) = img.dimensions();
        let (overlay_width, overlay_height) = overlay.dimensions();

        if overlay_width > width || overlay_height > height {
            return Err(ProcessingError::WatermarkTooLarge {
                overlay_width,
                overlay_height,
                width,
                height,
            });
        }

        let x = i64::from(width - overlay_width);
        let y = i64::from(height - overlay_height);

        let mut canvas = img.to_rgba8();
        imageops::overlay(&mut canvas, &overlay, x, y);

        Ok(DynamicImage::ImageRgba8(canvas))
    }
}
