use axum::{extract::State, routing::get, Json, Router};

use super::ApiResponse;
use crate::types::TrackingSnapshot;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(get_tracking))
}

/// Currently tracked breakouts and breakdowns.
async fn get_tracking(State(state): State<AppState>) -> Json<ApiResponse<TrackingSnapshot>> {
    Json(ApiResponse::cached(state.tracking.snapshot().await))
}
