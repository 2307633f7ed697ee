//! OpenAPI documentation, served at `/api/openapi.json` and rendered by
//! RapiDoc under `/docs`.

use utoipa::OpenApi;

use crate::handlers;
use crate::responses;
use imgstash_core::models;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Imgstash API",
        version = "0.1.0",
        description = "Image upload and transformation service. Every endpoint answers HTTP 200; failures carry `done: false` and a message."
    ),
    paths(
        // Uploads
        handlers::upload::upload_image,
        handlers::upload::upload_watermark,
        // Transforms
        handlers::edit::apply_watermark_and_edit,
        handlers::edit::convert_type,
        handlers::edit::change_size,
        // Retrieval
        handlers::media_get::list_media,
        handlers::media_get::get_media,
        handlers::image_get::get_image_file,
        // Health
        handlers::health::health_check,
    ),
    components(
        schemas(
            models::ImageRecord,
            models::ImageKind,
            handlers::edit::ApplyWatermarkRequest,
            handlers::edit::ConvertTypeRequest,
            handlers::edit::ChangeSizeRequest,
            responses::MessageResponse,
            responses::ImageResponse,
            responses::HealthResponse,
        )
    ),
    tags(
        (name = "images", description = "Image upload, retrieval and transformation"),
        (name = "watermark", description = "Pending watermark slot"),
        (name = "media", description = "Image record listing and lookup"),
        (name = "health", description = "Liveness check")
    )
)]
pub struct ApiDoc;
