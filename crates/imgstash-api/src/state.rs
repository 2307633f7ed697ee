//! Application state shared by all handlers.

use crate::services::ImageLifecycleService;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub images: ImageLifecycleService,
}

impl AppState {
    pub fn new(images: ImageLifecycleService) -> Arc<Self> {
        Arc::new(Self { images })
    }
}
