//! Queue statistics and admin endpoints.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/queue/stats
async fn stats(State(state): State<AppState>) -> impl IntoResponse {
    let stats = state.service.queue_stats().await;
    Json(DataResponse { data: stats })
}

/// POST /api/queue/pause
async fn pause(State(state): State<AppState>) -> impl IntoResponse {
    state.service.pause_queue();
    Json(DataResponse {
        data: serde_json::json!({ "paused": true }),
    })
}

/// POST /api/queue/resume
async fn resume(State(state): State<AppState>) -> impl IntoResponse {
    state.service.resume_queue();
    Json(DataResponse {
        data: serde_json::json!({ "paused": false }),
    })
}

/// POST /api/queue/clear
///
/// Drops every not-yet-started job; answers with the count dropped.
async fn clear(State(state): State<AppState>) -> impl IntoResponse {
    let dropped = state.service.clear_queue().await;
    Json(DataResponse {
        data: serde_json::json!({ "dropped": dropped }),
    })
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/queue/stats", get(stats))
        .route("/api/queue/pause", post(pause))
        .route("/api/queue/resume", post(resume))
        .route("/api/queue/clear", post(clear))
}
