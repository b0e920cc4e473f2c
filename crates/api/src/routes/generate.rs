//! Generation endpoints.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};

use spritemill_core::types::GenerationRequest;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

/// POST /api/generate
///
/// Resolves from cache, generates synchronously (`wait_for_result`),
/// or enqueues and returns a job handle — see the `status` tag of the
/// response body.
async fn generate(
    State(state): State<AppState>,
    Json(request): Json<GenerationRequest>,
) -> AppResult<impl IntoResponse> {
    let response = state.service.generate(request).await?;
    Ok(Json(DataResponse { data: response }))
}

/// POST /api/pregenerate
///
/// Fire-and-forget cache warming. Always answers 202: failures are
/// logged server-side, never surfaced.
async fn pregenerate(
    State(state): State<AppState>,
    Json(requests): Json<Vec<GenerationRequest>>,
) -> impl IntoResponse {
    let accepted = requests.len();
    state.service.pregenerate(requests).await;
    (
        axum::http::StatusCode::ACCEPTED,
        Json(DataResponse {
            data: serde_json::json!({ "accepted": accepted }),
        }),
    )
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/generate", post(generate))
        .route("/api/pregenerate", post(pregenerate))
}
