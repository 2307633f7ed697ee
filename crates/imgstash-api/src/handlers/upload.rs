use crate::error::HandlerError;
use crate::responses::{ImageResponse, MessageResponse};
use crate::state::AppState;
use axum::{
    extract::{multipart::MultipartError, Multipart, State},
    http::StatusCode,
    Json,
};
use bytes::Bytes;
use imgstash_core::AppError;
use std::sync::Arc;

/// Multipart field carrying the file.
const FILE_FIELD: &str = "file";

struct UploadedFile {
    file_name: String,
    data: Bytes,
}

fn multipart_error(err: MultipartError, failure_message: &'static str) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(format!("File too large: {}", err.body_text()))
    } else {
        tracing::debug!(error = %err.body_text(), "Malformed multipart body");
        AppError::InvalidInput(failure_message.to_string())
    }
}

/// Pull the `file` field out of a multipart body.
async fn read_file_field(
    mut multipart: Multipart,
    failure_message: &'static str,
) -> Result<UploadedFile, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, failure_message))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let file_name = field.file_name().unwrap_or_default().to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| multipart_error(e, failure_message))?;

        return Ok(UploadedFile { file_name, data });
    }

    Err(AppError::InvalidInput(failure_message.to_string()))
}

/// Upload image handler
///
/// Stores the `file` field under a generated name, decodes its metadata and
/// creates the record.
#[utoipa::path(
    post,
    path = "/upload",
    tag = "images",
    request_body(content = inline(Object), content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Image uploaded, or `done: false` with the failure message", body = ImageResponse)
    )
)]
#[tracing::instrument(skip(state, multipart), fields(operation = "upload_image"))]
pub async fn upload_image(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Json<ImageResponse>, HandlerError> {
    let file = read_file_field(multipart, "Error uploading file.")
        .await
        .map_err(HandlerError::from)?;

    tracing::debug!(
        original_name = %file.file_name,
        size_bytes = file.data.len(),
        "Received image upload"
    );

    let image = state
        .images
        .upload(&file.file_name, file.data)
        .await
        .map_err(HandlerError::with("Error processing image"))?;

    Ok(Json(ImageResponse::done("Image uploaded successfully", image)))
}

/// Upload watermark handler
///
/// Replaces the pending watermark; no record is created.
#[utoipa::path(
    post,
    path = "/uploadWM",
    tag = "watermark",
    request_body(content = inline(Object), content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Watermark stored, or `done: false` with the failure message", body = MessageResponse)
    )
)]
#[tracing::instrument(skip(state, multipart), fields(operation = "upload_watermark"))]
pub async fn upload_watermark(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Json<MessageResponse>, HandlerError> {
    let file = read_file_field(multipart, "Error uploading watermark.")
        .await
        .map_err(HandlerError::from)?;

    state
        .images
        .upload_watermark(file.data)
        .await
        .map_err(HandlerError::with("Error saving watermark"))?;

    Ok(Json(MessageResponse::done("Watermark saved")))
}
