//! HTTP server setup and configuration.
//!
//! This module provides the router and application state used by both
//! the production server and integration tests.

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::api;
use crate::error::ApiError;
use crate::models::{AppConfig, PanelSpec};
use crate::panel::{BoxedBus, PanelDriver, PanelTiming};
use crate::services::{CoordinatorOptions, DisplayCoordinator};

/// Multipart framing on top of the file itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<DisplayCoordinator>,
    pub max_upload_bytes: usize,
}

/// Create application state around a panel bus.
pub fn create_app_state(config: &AppConfig, bus: BoxedBus) -> anyhow::Result<AppState> {
    let spec = PanelSpec::ACEP_7IN3F;
    let quantizer = config.build_quantizer(&spec)?;
    let driver = PanelDriver::new(bus, spec, PanelTiming::ACEP_7IN3F);
    let options = CoordinatorOptions {
        queue_timeout: config.upload.queue_timeout(),
        preview_dir: config.upload.preview_dir.clone(),
        preview_keep: config.upload.preview_keep,
    };

    Ok(AppState {
        coordinator: Arc::new(DisplayCoordinator::new(driver, quantizer, options)),
        max_upload_bytes: config.upload.max_bytes,
    })
}

/// Build the API router with all endpoints and middleware.
///
/// This is the core router used by both production and tests. Previews are
/// served from the coordinator's preview directory when one is configured.
pub fn build_router(state: AppState) -> Router {
    let body_limit = state.max_upload_bytes.saturating_add(MULTIPART_OVERHEAD);
    let preview_dir = state.coordinator.options().preview_dir.clone();

    let router = Router::new()
        .route("/", get(api::handle_index))
        .route(
            "/api/upload",
            post(handle_upload).layer(DefaultBodyLimit::max(body_limit)),
        )
        .route("/api/status", get(handle_status))
        // Health check
        .route("/health", get(|| async { "OK" }));

    let router = match preview_dir {
        Some(dir) => router.nest_service("/processed", ServeDir::new(dir)),
        None => router,
    };

    router
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

// Wrapper handlers to extract state components for the underlying API handlers

async fn handle_upload(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<axum::Json<api::UploadResponse>, ApiError> {
    api::handle_upload(
        State(state.coordinator),
        State(state.max_upload_bytes),
        multipart,
    )
    .await
}

async fn handle_status(
    State(state): State<AppState>,
) -> axum::Json<crate::services::CoordinatorStatus> {
    api::handle_status(State(state.coordinator)).await
}
