pub mod image;

pub use image::{merge_extra_types, ImageKind, ImageRecord, NewImageRecord};
