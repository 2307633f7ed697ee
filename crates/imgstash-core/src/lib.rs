//! Imgstash Core Library
//!
//! This crate provides the domain model, error types and configuration that are
//! shared across all imgstash components.

pub mod config;
pub mod error;
pub mod models;

// Re-export commonly used types
pub use config::Config;
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use models::{merge_extra_types, ImageKind, ImageRecord, NewImageRecord};
