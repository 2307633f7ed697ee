//! Error types
//!
//! Every failure a handler can hit is an [`AppError`]. A variant decides how
//! loudly it is logged and what the client is told; the HTTP layer reports all
//! of them as a logical `done: false` outcome, never as a status code.
//!
//! The `Database` variant wraps `sqlx::Error` only with the `sqlx` feature.

use std::io;

#[cfg(feature = "sqlx")]
use sqlx::Error as SqlxError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Caller mistakes: bad ids, missing fields.
    Debug,
    /// Bad input data, e.g. a file that is not an image.
    Warn,
    Error,
}

/// How an error presents itself outside the process.
pub trait ErrorMetadata {
    /// Stable code for structured logs, e.g. `STORAGE_ERROR`.
    fn error_code(&self) -> &'static str;

    /// Whether the same request could succeed later.
    fn is_recoverable(&self) -> bool;

    /// Text safe to put in a response body.
    fn client_message(&self) -> String;

    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[cfg(feature = "sqlx")]
    #[error("Database error: {0}")]
    Database(#[source] SqlxError),

    #[cfg(not(feature = "sqlx"))]
    #[error("Database error: {0}")]
    Database(String),

    /// Blob area I/O.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Decode, resize, composite or encode failure.
    #[error("Image processing error: {0}")]
    ImageProcessing(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Unknown record, or a record whose blob is gone.
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("File too large: {0}")]
    PayloadTooLarge(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

#[cfg(feature = "sqlx")]
impl From<SqlxError> for AppError {
    fn from(err: SqlxError) -> Self {
        AppError::Database(err)
    }
}

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        AppError::Storage(format!("IO error: {}", err))
    }
}

impl AppError {
    /// Variant name for structured logs.
    pub fn error_type(&self) -> &'static str {
        match self {
            AppError::Database(_) => "Database",
            AppError::Storage(_) => "Storage",
            AppError::ImageProcessing(_) => "ImageProcessing",
            AppError::InvalidInput(_) => "InvalidInput",
            AppError::NotFound(_) => "NotFound",
            AppError::PayloadTooLarge(_) => "PayloadTooLarge",
            AppError::Internal(_) => "Internal",
        }
    }

    /// Display text followed by the `source()` chain, for logs.
    pub fn detailed_message(&self) -> String {
        use std::error::Error;

        let mut details = self.to_string();
        let mut source = self.source();
        while let Some(err) = source {
            details.push_str(&format!("\n  Caused by: {}", err));
            source = err.source();
        }
        details
    }

    /// Client input problems, as opposed to failures on our side.
    fn is_client_error(&self) -> bool {
        matches!(
            self,
            AppError::InvalidInput(_) | AppError::NotFound(_) | AppError::PayloadTooLarge(_)
        )
    }
}

impl ErrorMetadata for AppError {
    fn error_code(&self) -> &'static str {
        match self {
            AppError::Database(_) => "DATABASE_ERROR",
            AppError::Storage(_) => "STORAGE_ERROR",
            AppError::ImageProcessing(_) => "IMAGE_PROCESSING_ERROR",
            AppError::InvalidInput(_) => "INVALID_INPUT",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::PayloadTooLarge(_) => "PAYLOAD_TOO_LARGE",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AppError::Database(_) | AppError::Storage(_) | AppError::Internal(_)
        )
    }

    fn log_level(&self) -> LogLevel {
        match self {
            _ if self.is_client_error() => LogLevel::Debug,
            AppError::ImageProcessing(_) => LogLevel::Warn,
            _ => LogLevel::Error,
        }
    }

    fn client_message(&self) -> String {
        match self {
            AppError::Database(_) => "Failed to access database".to_string(),
            AppError::Storage(_) => "Failed to access storage".to_string(),
            AppError::Internal(_) => "Internal server error".to_string(),
            AppError::ImageProcessing(msg)
            | AppError::InvalidInput(msg)
            | AppError::NotFound(msg)
            | AppError::PayloadTooLarge(msg) => msg.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_errors_are_hidden_and_retryable() {
        #[cfg(feature = "sqlx")]
        let err = AppError::from(sqlx::Error::PoolClosed);
        #[cfg(not(feature = "sqlx"))]
        let err = AppError::Database("pool closed".to_string());
        assert_eq!(err.error_code(), "DATABASE_ERROR");
        assert!(err.is_recoverable());
        assert_eq!(err.client_message(), "Failed to access database");
        assert_eq!(err.log_level(), LogLevel::Error);
    }

    #[test]
    fn test_not_found_is_quiet() {
        let err = AppError::NotFound("Image not found".to_string());
        assert_eq!(err.error_code(), "NOT_FOUND");
        assert!(!err.is_recoverable());
        assert_eq!(err.client_message(), "Image not found");
        assert_eq!(err.log_level(), LogLevel::Debug);
    }

    #[test]
    fn test_undecodable_image_logs_warning() {
        let err = AppError::ImageProcessing("unknown format".to_string());
        assert_eq!(err.log_level(), LogLevel::Warn);
        assert_eq!(err.client_message(), "unknown format");
    }

    #[test]
    fn test_storage_details_are_hidden_from_clients() {
        let err = AppError::Storage("/var/lib/imgstash/images/a.png: permission denied".into());
        assert_eq!(err.client_message(), "Failed to access storage");
        assert!(err.to_string().contains("permission denied"));
    }

    #[test]
    fn test_io_error_maps_to_storage() {
        let err = AppError::from(io::Error::new(io::ErrorKind::NotFound, "gone"));
        assert_eq!(err.error_type(), "Storage");
        assert!(err.detailed_message().contains("gone"));
    }
}
