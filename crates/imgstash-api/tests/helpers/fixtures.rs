//! Test fixtures: real encoded images.

use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use std::io::Cursor;

fn encode(img: DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, format).expect("encode fixture");
    out.into_inner()
}

/// Opaque PNG with a horizontal gradient.
pub fn create_test_png(width: u32, height: u32) -> Vec<u8> {
    let img = RgbaImage::from_fn(width, height, |x, _| {
        Rgba([(x * 255 / width.max(1)) as u8, 64, 128, 255])
    });
    encode(DynamicImage::ImageRgba8(img), ImageFormat::Png)
}

pub fn create_test_jpeg(width: u32, height: u32) -> Vec<u8> {
    let img = RgbaImage::from_pixel(width, height, Rgba([200, 30, 30, 255]));
    encode(
        DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(img).to_rgb8()),
        ImageFormat::Jpeg,
    )
}

/// Small solid white watermark.
pub fn create_watermark_png(width: u32, height: u32) -> Vec<u8> {
    let img = RgbaImage::from_pixel(width, height, Rgba([255, 255, 255, 255]));
    encode(DynamicImage::ImageRgba8(img), ImageFormat::Png)
}

/// Decode bytes and return `(format, width, height)`.
pub fn inspect(data: &[u8]) -> (ImageFormat, u32, u32) {
    let format = image::guess_format(data).expect("recognizable image");
    let img = image::load_from_memory(data).expect("decodable image");
    (format, img.width(), img.height())
}
