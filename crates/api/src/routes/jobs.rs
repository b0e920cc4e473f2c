//! Job status and cancellation endpoints.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/jobs/{id}
///
/// Job records stay queryable for a retention window after they
/// finish, then 404.
async fn get_job(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let job = state
        .service
        .get_job_status(job_id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Job {job_id} not found")))?;
    Ok(Json(DataResponse { data: job }))
}

/// DELETE /api/jobs/{id}
///
/// Only jobs still queued can be cancelled; generating jobs run to
/// completion and answer 409.
async fn cancel_job(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    if state.service.cancel_job(job_id).await {
        tracing::info!(job_id = %job_id, "Job cancelled via API");
        Ok(Json(DataResponse {
            data: serde_json::json!({ "cancelled": true }),
        }))
    } else {
        Err(AppError::BadRequest(format!(
            "Job {job_id} is not queued (unknown, already running, or finished)"
        )))
    }
}

pub fn router() -> Router<AppState> {
    Router::new().route("/api/jobs/{id}", get(get_job).delete(cancel_job))
}
