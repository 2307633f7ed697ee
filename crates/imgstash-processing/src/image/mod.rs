//! Image processing module
//!
//! - Metadata extraction (processor)
//! - Resize and format conversion (transformer)
//! - Bottom-right watermark compositing (watermark)

pub mod processor;
pub mod transformer;
pub mod watermark;

pub use processor::ImageProcessor;
pub use transformer::ImageTransformer;
pub use watermark::Watermark;
