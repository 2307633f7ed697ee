//! HTTP error response conversion
//!
//! Every logical failure is reported with HTTP 200 and a `{message, done: false}`
//! body; clients inspect `done`, never the status code.
//!
//! Handlers return `Result<_, HandlerError>` and attach the operation's generic
//! failure message with `.map_err(HandlerError::with("Error ..."))`. Validation
//! and not-found errors keep their own message; storage, database and
//! processing failures are reported with the operation message.

use crate::responses::MessageResponse;
use axum::{
    extract::rejection::JsonRejection,
    extract::{FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use imgstash_core::{AppError, ErrorMetadata, LogLevel};
use serde::de::DeserializeOwned;
use validator::Validate;

/// Message used when a JSON body is missing required fields.
pub const MISSING_FIELDS_MESSAGE: &str = "fill all the entries";

/// Wrapper type for AppError to implement IntoResponse
#[derive(Debug)]
pub struct HandlerError {
    pub error: AppError,
    pub operation_message: Option<&'static str>,
}

impl HandlerError {
    /// Map an `AppError` into a handler error carrying `operation_message`.
    pub fn with(operation_message: &'static str) -> impl Fn(AppError) -> HandlerError {
        move |error| HandlerError {
            error,
            operation_message: Some(operation_message),
        }
    }

    /// Message sent to the client.
    pub fn message(&self) -> String {
        match (&self.error, self.operation_message) {
            (AppError::InvalidInput(_) | AppError::NotFound(_) | AppError::PayloadTooLarge(_), _) => {
                self.error.client_message()
            }
            (_, Some(message)) => message.to_string(),
            (_, None) => self.error.client_message(),
        }
    }
}

impl From<AppError> for HandlerError {
    fn from(error: AppError) -> Self {
        HandlerError {
            error,
            operation_message: None,
        }
    }
}

/// Convert JSON body deserialization failures into an input-validation error.
impl From<JsonRejection> for HandlerError {
    fn from(rejection: JsonRejection) -> Self {
        HandlerError::from(AppError::InvalidInput(format!(
            "Invalid request body: {}",
            rejection.body_text()
        )))
    }
}

/// JSON body extractor that parses, validates, and reports both kinds of
/// failure in the `{message, done: false}` shape.
#[derive(Debug, Clone, Copy)]
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate + Send,
    S: Send + Sync,
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
{
    type Rejection = HandlerError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(inner) = Json::<T>::from_request(req, state)
            .await
            .map_err(HandlerError::from)?;

        inner.validate().map_err(|errors| {
            let field_errors = errors.field_errors();
            let fields: Vec<&str> = field_errors.keys().map(|k| k.as_ref()).collect();
            tracing::debug!(fields = ?fields, "Request body failed validation");
            HandlerError::from(AppError::InvalidInput(MISSING_FIELDS_MESSAGE.to_string()))
        })?;

        Ok(ValidatedJson(inner))
    }
}

fn log_error(error: &AppError) {
    let error_type = error.error_type();
    let details = error.detailed_message();
    match error.log_level() {
        LogLevel::Debug => {
            tracing::debug!(error = %details, error_type = error_type, "Request failed");
        }
        LogLevel::Warn => {
            tracing::warn!(error = %details, error_type = error_type, "Request failed");
        }
        LogLevel::Error => {
            tracing::error!(
                error = %details,
                error_type = error_type,
                code = error.error_code(),
                recoverable = error.is_recoverable(),
                "Request failed"
            );
        }
    }
}

impl IntoResponse for HandlerError {
    fn into_response(self) -> Response {
        log_error(&self.error);
        (StatusCode::OK, Json(MessageResponse::failed(self.message()))).into_response()
    }
}
