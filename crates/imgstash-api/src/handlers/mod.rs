//! HTTP handlers. Each one delegates to [`crate::services::ImageLifecycleService`]
//! and renders the `{message, done}` contract.

pub mod edit;
pub mod health;
pub mod image_get;
pub mod media_get;
pub mod upload;
