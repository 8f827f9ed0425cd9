use axum::{extract::State, response::Json};
use std::sync::Arc;

use crate::services::{CoordinatorStatus, DisplayCoordinator};

/// Current panel state and render counters
///
/// Answers immediately, also while a refresh is in progress.
#[utoipa::path(
    get,
    path = "/api/status",
    responses(
        (status = 200, description = "Coordinator snapshot", body = CoordinatorStatus),
    ),
    tag = "Status"
)]
pub async fn handle_status(
    State(coordinator): State<Arc<DisplayCoordinator>>,
) -> Json<CoordinatorStatus> {
    Json(coordinator.status())
}
