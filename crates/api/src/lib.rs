//! HTTP surface of the Spritemill asset-generation service.
//!
//! Exposes the orchestrator's `generate` contract plus job, queue, and
//! cache management endpoints, and serves the cached asset tree as
//! static files under `/assets`.

pub mod config;
pub mod error;
pub mod response;
pub mod routes;
pub mod state;

use axum::http::HeaderValue;
use axum::Router;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Assemble the full application router.
pub fn build_router(state: AppState) -> Router {
    let origins: Vec<HeaderValue> = state
        .config
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any);

    let assets_dir = state.service_assets_dir();

    Router::new()
        .merge(routes::health::router())
        .merge(routes::generate::router())
        .merge(routes::jobs::router())
        .merge(routes::queue::router())
        .merge(routes::cache::router())
        .nest_service("/assets", ServeDir::new(assets_dir))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
