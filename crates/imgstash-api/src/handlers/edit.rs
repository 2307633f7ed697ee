use crate::error::{HandlerError, ValidatedJson, MISSING_FIELDS_MESSAGE};
use crate::responses::{ImageResponse, MessageResponse};
use crate::services::parse_image_id;
use crate::state::AppState;
use axum::{extract::State, Json};
use imgstash_core::AppError;
use serde::{de, Deserialize, Deserializer};
use std::sync::Arc;
use utoipa::ToSchema;
use validator::Validate;

/// Accept a dimension as a JSON number or a numeric string. Strings are read
/// up to the first non-digit (`"50px"` is 50); an empty string counts as absent.
fn dimension<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Int(u64),
        Float(f64),
        Text(String),
    }

    match Option::<Raw>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Raw::Int(n)) => u32::try_from(n)
            .map(Some)
            .map_err(|_| de::Error::custom("dimension is out of range")),
        Some(Raw::Float(f)) if f.is_finite() && f >= 0.0 && f <= f64::from(u32::MAX) => {
            Ok(Some(f.trunc() as u32))
        }
        Some(Raw::Float(_)) => Err(de::Error::custom("dimension must be a non-negative number")),
        Some(Raw::Text(s)) => {
            let s = s.trim();
            if s.is_empty() {
                return Ok(None);
            }
            let digits: String = s.chars().take_while(|c| c.is_ascii_digit()).collect();
            digits
                .parse::<u32>()
                .map(Some)
                .map_err(|_| de::Error::custom(format!("dimension is not a number: {}", s)))
        }
    }
}

fn required<T>(value: Option<T>) -> Result<T, HandlerError> {
    value.ok_or_else(|| AppError::InvalidInput(MISSING_FIELDS_MESSAGE.to_string()).into())
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ApplyWatermarkRequest {
    #[validate(required, length(min = 1))]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "dimension")]
    #[validate(required, range(min = 1))]
    pub width: Option<u32>,
    #[serde(default, deserialize_with = "dimension")]
    #[validate(required, range(min = 1))]
    pub height: Option<u32>,
    /// Output format: png, jpeg (or jpg), webp, gif
    #[serde(rename = "type", default)]
    pub image_type: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ConvertTypeRequest {
    #[validate(required, length(min = 1))]
    pub id: Option<String>,
    #[serde(rename = "newType", default)]
    #[validate(required, length(min = 1))]
    pub new_type: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ChangeSizeRequest {
    #[validate(required, length(min = 1))]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "dimension")]
    #[validate(required, range(min = 1))]
    pub width: Option<u32>,
    #[serde(default, deserialize_with = "dimension")]
    #[validate(required, range(min = 1))]
    pub height: Option<u32>,
}

/// Resize a record into a new record, compositing the pending watermark if
/// there is one.
#[utoipa::path(
    post,
    path = "/apply-watermark-and-edit",
    tag = "images",
    request_body = ApplyWatermarkRequest,
    responses(
        (status = 200, description = "Derived image created, or `done: false` with the failure message", body = ImageResponse)
    )
)]
#[tracing::instrument(skip(state, body), fields(operation = "apply_watermark_and_edit", image_id = ?body.id))]
pub async fn apply_watermark_and_edit(
    State(state): State<Arc<AppState>>,
    ValidatedJson(body): ValidatedJson<ApplyWatermarkRequest>,
) -> Result<Json<ImageResponse>, HandlerError> {
    let id = parse_image_id(&required(body.id)?)?;
    let width = required(body.width)?;
    let height = required(body.height)?;

    let image = state
        .images
        .apply_watermark_and_edit(id, width, height, body.image_type.as_deref())
        .await
        .map_err(HandlerError::with("Error applying watermark"))?;

    Ok(Json(ImageResponse::done("Watermark applied", image)))
}

/// Re-encode a record's image in another format, in place.
#[utoipa::path(
    post,
    path = "/convert-type",
    tag = "images",
    request_body = ConvertTypeRequest,
    responses(
        (status = 200, description = "Image converted, or `done: false` with the failure message", body = MessageResponse)
    )
)]
#[tracing::instrument(skip(state, body), fields(operation = "convert_type", image_id = ?body.id))]
pub async fn convert_type(
    State(state): State<Arc<AppState>>,
    ValidatedJson(body): ValidatedJson<ConvertTypeRequest>,
) -> Result<Json<MessageResponse>, HandlerError> {
    let id = parse_image_id(&required(body.id)?)?;
    let new_type = required(body.new_type)?;

    state
        .images
        .convert_type(id, &new_type)
        .await
        .map_err(HandlerError::with("Error converting image"))?;

    Ok(Json(MessageResponse::done("Image type converted")))
}

/// Resize a record's image in place.
#[utoipa::path(
    post,
    path = "/change-size",
    tag = "images",
    request_body = ChangeSizeRequest,
    responses(
        (status = 200, description = "Image resized, or `done: false` with the failure message", body = MessageResponse)
    )
)]
#[tracing::instrument(skip(state, body), fields(operation = "change_size", image_id = ?body.id))]
pub async fn change_size(
    State(state): State<Arc<AppState>>,
    ValidatedJson(body): ValidatedJson<ChangeSizeRequest>,
) -> Result<Json<MessageResponse>, HandlerError> {
    let id = parse_image_id(&required(body.id)?)?;
    let width = required(body.width)?;
    let height = required(body.height)?;

    state
        .images
        .change_size(id, width, height)
        .await
        .map_err(HandlerError::with("Error resizing image"))?;

    Ok(Json(MessageResponse::done("Image resized")))
}
