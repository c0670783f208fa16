use crate::config::Config;
use crate::engine::EngineHandle;
use crate::error_log::ErrorLog;
use crate::handlers::{health_check, recognize_face};
use crate::reference::ReferenceGallery;
use crate::staging::StagingArea;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Shared per-process state handed to every request.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub engine: EngineHandle,
    pub gallery: Arc<ReferenceGallery>,
    pub staging: Arc<StagingArea>,
    pub error_log: Arc<dyn ErrorLog>,
}

impl AppState {
    pub fn new(config: Config, engine: EngineHandle, error_log: Arc<dyn ErrorLog>) -> Self {
        let gallery = ReferenceGallery::new(
            config.employee_images_dir.clone(),
            config.reference_prefix.clone(),
            config.reference_extension.clone(),
        );
        let staging = StagingArea::new(config.temp_images_dir.clone());

        Self {
            config: Arc::new(config),
            engine,
            gallery: Arc::new(gallery),
            staging: Arc::new(staging),
            error_log,
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes;

    Router::new()
        .route("/recognize_face", post(recognize_face))
        .route("/health", get(health_check))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
