//! Imgstash API Library
//!
//! HTTP handlers, the image lifecycle service and application setup.

pub mod api_doc;
pub mod error;
pub mod handlers;
pub mod responses;
pub mod services;
pub mod setup;
pub mod state;
pub mod telemetry;

pub use error::HandlerError;
pub use state::AppState;
