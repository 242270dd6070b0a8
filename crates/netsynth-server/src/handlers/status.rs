//! Handler for the status endpoint.

use axum::extract::State;
use axum::Json;

use crate::schema::status::StatusResponse;
use crate::state::AppState;

/// Reports admission counters and the jobs currently queued or running.
///
/// `GET /status`
pub async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(state.service.status())
}
