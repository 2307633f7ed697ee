pub mod image_lifecycle;

pub use image_lifecycle::{parse_image_id, ImageLifecycleService};
