//! Response bodies shared by the handlers.

use imgstash_core::ImageRecord;
use serde::Serialize;
use utoipa::ToSchema;

/// `{message, done}` outcome body.
#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
    pub done: bool,
}

impl MessageResponse {
    pub fn done(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            done: true,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            done: false,
        }
    }
}

/// `{message, image, done}` outcome body for operations producing a record.
#[derive(Debug, Serialize, ToSchema)]
pub struct ImageResponse {
    pub message: String,
    pub image: ImageRecord,
    pub done: bool,
}

impl ImageResponse {
    pub fn done(message: impl Into<String>, image: ImageRecord) -> Self {
        Self {
            message: message.into(),
            image,
            done: true,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
}
