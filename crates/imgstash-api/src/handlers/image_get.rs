use crate::error::HandlerError;
use crate::services::parse_image_id;
use crate::state::AppState;
use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, StatusCode},
    response::Response,
};
use futures::StreamExt;
use imgstash_core::AppError;
use std::sync::Arc;

/// Stream the blob behind a record with `Content-Type: image/<type>`.
#[utoipa::path(
    get,
    path = "/image/{id}",
    tag = "images",
    params(
        ("id" = String, Path, description = "Image ID")
    ),
    responses(
        (status = 200, description = "Raw image bytes, or a JSON `done: false` body when the record or blob is missing", content_type = "image/*")
    )
)]
#[tracing::instrument(skip(state), fields(operation = "get_image_file"))]
pub async fn get_image_file(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Response, HandlerError> {
    let id = parse_image_id(&id)?;
    let (image, stream) = state
        .images
        .open_blob(id)
        .await
        .map_err(HandlerError::with("Error rendering image"))?;

    tracing::debug!(image_id = %id, filename = %image.filename, "Streaming image blob");

    let body_stream = stream.map(|result| {
        result.map_err(|e| std::io::Error::other(format!("Storage stream error: {}", e)))
    });

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, image.content_type())
        .body(Body::from_stream(body_stream))
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to build response");
            HandlerError::from(AppError::Internal(e.to_string()))
        })?;

    Ok(response)
}
