//! Cache statistics, search, and cleanup endpoints.

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

use spritemill_core::types::AssetType;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/cache/stats
async fn stats(State(state): State<AppState>) -> impl IntoResponse {
    let stats = state.service.cache_stats().await;
    Json(DataResponse { data: stats })
}

/// Query parameters for GET /api/cache/search.
#[derive(Debug, Deserialize)]
struct SearchParams {
    q: String,
    #[serde(rename = "type")]
    asset_type: Option<String>,
    limit: Option<usize>,
}

/// GET /api/cache/search?q=dwarf+blacksmith&type=character&limit=10
async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> AppResult<impl IntoResponse> {
    let asset_type = params
        .asset_type
        .as_deref()
        .map(AssetType::from_name)
        .transpose()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let results = state
        .service
        .search_cache(&params.q, asset_type, params.limit)
        .await;
    Ok(Json(DataResponse { data: results }))
}

/// POST /api/cache/cleanup
///
/// Purges entries older than the TTL; answers with the count removed.
async fn cleanup(State(state): State<AppState>) -> impl IntoResponse {
    let removed = state.service.cleanup_cache().await;
    Json(DataResponse {
        data: serde_json::json!({ "removed": removed }),
    })
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/cache/stats", get(stats))
        .route("/api/cache/search", get(search))
        .route("/api/cache/cleanup", post(cleanup))
}
