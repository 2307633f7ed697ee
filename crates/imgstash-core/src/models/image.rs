use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;
use uuid::Uuid;

#[cfg(feature = "sqlx")]
use sqlx::FromRow;

/// Encoded formats the service can read and write.
///
/// The canonical name doubles as the record `type` and as the file extension
/// used for every blob the service derives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ImageKind {
    Png,
    Jpeg,
    #[serde(rename = "webp")]
    WebP,
    Gif,
}

impl ImageKind {
    pub const ALL: [ImageKind; 4] = [
        ImageKind::Png,
        ImageKind::Jpeg,
        ImageKind::WebP,
        ImageKind::Gif,
    ];

    /// Parse a format name or file extension (case-insensitive, `jpg` accepted).
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "png" => Some(ImageKind::Png),
            "jpeg" | "jpg" => Some(ImageKind::Jpeg),
            "webp" => Some(ImageKind::WebP),
            "gif" => Some(ImageKind::Gif),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ImageKind::Png => "png",
            ImageKind::Jpeg => "jpeg",
            ImageKind::WebP => "webp",
            ImageKind::Gif => "gif",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            ImageKind::Png => "image/png",
            ImageKind::Jpeg => "image/jpeg",
            ImageKind::WebP => "image/webp",
            ImageKind::Gif => "image/gif",
        }
    }
}

impl fmt::Display for ImageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted metadata describing one stored image variant.
///
/// `type` is optional because records written before the schema settled may
/// lack it; `extra_types` never holds duplicates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(FromRow))]
#[serde(rename_all = "camelCase")]
pub struct ImageRecord {
    pub id: Uuid,
    pub filename: String,
    pub path: Option<String>,
    #[serde(rename = "type")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "type"))]
    pub image_type: Option<String>,
    pub size: String,
    #[cfg_attr(feature = "sqlx", sqlx(try_from = "i32"))]
    pub width: u32,
    #[cfg_attr(feature = "sqlx", sqlx(try_from = "i32"))]
    pub height: u32,
    pub extra_types: Vec<String>,
    pub tag: Option<String>,
}

impl ImageRecord {
    /// Content type used when streaming the blob back. Legacy aliases such as
    /// `jpg` map to their canonical MIME type.
    pub fn content_type(&self) -> String {
        match self.image_type.as_deref().map(str::trim) {
            Some("") | None => "application/octet-stream".to_string(),
            Some(t) => ImageKind::parse(t)
                .map(|kind| kind.mime_type().to_string())
                .unwrap_or_else(|| format!("image/{}", t)),
        }
    }
}

/// Insert payload for a new record; the store assigns the id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewImageRecord {
    pub filename: String,
    pub image_type: Option<String>,
    pub size: String,
    pub width: u32,
    pub height: u32,
    pub extra_types: Vec<String>,
    pub tag: Option<String>,
}

impl NewImageRecord {
    pub fn new(filename: String, kind: ImageKind, size: u64, width: u32, height: u32) -> Self {
        Self {
            filename,
            image_type: Some(kind.as_str().to_string()),
            size: size.to_string(),
            width,
            height,
            extra_types: Vec::new(),
            tag: None,
        }
    }

    pub fn into_record(self, id: Uuid) -> ImageRecord {
        ImageRecord {
            id,
            filename: self.filename,
            path: None,
            image_type: self.image_type,
            size: self.size,
            width: self.width,
            height: self.height,
            extra_types: merge_extra_types(&[], &self.extra_types),
            tag: self.tag,
        }
    }
}

/// Append `additions` to `existing`, dropping empty strings and anything
/// already present. First-seen order is kept.
pub fn merge_extra_types(existing: &[String], additions: &[String]) -> Vec<String> {
    let mut merged: Vec<String> = Vec::with_capacity(existing.len() + additions.len());
    for value in existing.iter().chain(additions) {
        if value.is_empty() || merged.contains(value) {
            continue;
        }
        merged.push(value.clone());
    }
    merged
}
