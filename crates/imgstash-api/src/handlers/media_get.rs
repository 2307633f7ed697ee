use crate::error::HandlerError;
use crate::services::parse_image_id;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    Json,
};
use imgstash_core::ImageRecord;
use std::sync::Arc;

/// List every image record in creation order.
#[utoipa::path(
    get,
    path = "/media",
    tag = "media",
    responses(
        (status = 200, description = "All records, or `done: false` with the failure message", body = Vec<ImageRecord>)
    )
)]
#[tracing::instrument(skip(state), fields(operation = "list_media"))]
pub async fn list_media(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<ImageRecord>>, HandlerError> {
    let images = state
        .images
        .list()
        .await
        .map_err(HandlerError::with("Error while getting images"))?;

    tracing::debug!(count = images.len(), "Listed image records");

    Ok(Json(images))
}

#[utoipa::path(
    get,
    path = "/media/{id}",
    tag = "media",
    params(
        ("id" = String, Path, description = "Image ID")
    ),
    responses(
        (status = 200, description = "The record, or `done: false` with the failure message", body = ImageRecord)
    )
)]
#[tracing::instrument(skip(state), fields(operation = "get_media"))]
pub async fn get_media(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ImageRecord>, HandlerError> {
    let id = parse_image_id(&id)?;
    let image = state
        .images
        .get(id)
        .await
        .map_err(HandlerError::with("Error while getting image"))?;

    Ok(Json(image))
}
