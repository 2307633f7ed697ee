//! Blob name derivation.
//!
//! Every name the service writes is built here. The extension of a blob name
//! always reflects the encoded format of its bytes.

use imgstash_core::ImageKind;
use uuid::Uuid;

pub const RESIZED_PREFIX: &str = "resized-";
pub const WATERMARKED_PREFIX: &str = "watermarked-";
pub const TEMP_PREFIX: &str = "tmp-";

const MAX_EXTENSION_LEN: usize = 10;

/// Split position of the extension separator, ignoring a leading dot.
fn ext_separator(name: &str) -> Option<usize> {
    match name.rfind('.') {
        Some(0) | None => None,
        Some(idx) => Some(idx),
    }
}

/// Name without its extension.
pub fn base_name(name: &str) -> &str {
    match ext_separator(name) {
        Some(idx) => &name[..idx],
        None => name,
    }
}

/// Extension without the dot, if any.
pub fn extension(name: &str) -> Option<&str> {
    ext_separator(name)
        .map(|idx| &name[idx + 1..])
        .filter(|ext| !ext.is_empty())
}

fn sanitized_extension(name: &str) -> Option<String> {
    extension(name)
        .filter(|ext| ext.len() <= MAX_EXTENSION_LEN && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| ext.to_ascii_lowercase())
}

/// Unique name for a freshly uploaded blob: `<millis>-<8 hex>.<ext>`.
///
/// Keeps the client's extension; falls back to the detected kind when the
/// client name has none.
pub fn upload_filename(original: &str, detected: Option<ImageKind>) -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let suffix = Uuid::new_v4().simple().to_string();
    let stem = format!("{}-{}", millis, &suffix[..8]);

    match sanitized_extension(original).or_else(|| detected.map(|k| k.as_str().to_string())) {
        Some(ext) => format!("{}.{}", stem, ext),
        None => stem,
    }
}

pub fn resized_filename(name: &str, requested: ImageKind) -> String {
    format!("{}{}.{}", RESIZED_PREFIX, base_name(name), requested)
}

/// `watermarked-<base>.<stored type>`. Records without a stored type keep
/// their current extension.
pub fn watermarked_filename(name: &str, stored_type: Option<&str>) -> String {
    let ext = stored_type
        .filter(|t| !t.is_empty())
        .or_else(|| extension(name));

    match ext {
        Some(ext) => format!("{}{}.{}", WATERMARKED_PREFIX, base_name(name), ext),
        None => format!("{}{}", WATERMARKED_PREFIX, base_name(name)),
    }
}

pub fn converted_filename(name: &str, kind: ImageKind) -> String {
    format!("{}.{}", base_name(name), kind)
}

pub fn temp_filename(name: &str) -> String {
    format!("{}{}", TEMP_PREFIX, name)
}
