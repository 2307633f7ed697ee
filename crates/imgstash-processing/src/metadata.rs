use imgstash_core::ImageKind;
use serde::Serialize;

/// Image metadata decoded from a blob
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageMetadata {
    pub kind: ImageKind,
    pub width: u32,
    pub height: u32,
    pub size_bytes: u64,
}
