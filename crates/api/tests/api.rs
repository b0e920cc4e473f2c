//! Router-level integration tests driven through `tower::ServiceExt`.
//!
//! The service is backed by the offline procedural provider so tests
//! run without credentials or network access.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use spritemill_api::config::ServerConfig;
use spritemill_api::state::AppState;
use spritemill_cache::{AssetCache, CacheConfig};
use spritemill_core::selection::SelectionMode;
use spritemill_core::types::ProviderId;
use spritemill_events::EventBus;
use spritemill_pipeline::{AssetService, ServiceConfig};
use spritemill_providers::{GenerationProvider, ProceduralProvider, ProviderRegistry};
use spritemill_queue::{GenerationQueue, QueueConfig};

/// Build an app wired to a temp cache and the procedural provider.
async fn build_test_app(cache_dir: &tempfile::TempDir) -> Router {
    let config = Arc::new(ServerConfig {
        host: "127.0.0.1".into(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".into()],
        cache_dir: cache_dir.path().to_path_buf(),
        cache_ttl_secs: 3600,
        generation_concurrency: 2,
        generation_max_retries: 3,
        generation_timeout_secs: 30,
        provider_mode: SelectionMode::Fixed(ProviderId::Procedural),
        pixellab_api_url: "https://api.pixellab.ai/v1".into(),
        pixellab_api_key: None,
        diffusion_api_url: None,
    });

    let cache = Arc::new(
        AssetCache::open(CacheConfig::new(cache_dir.path()))
            .await
            .unwrap(),
    );
    let providers: Vec<Arc<dyn GenerationProvider>> = vec![Arc::new(ProceduralProvider::new())];
    let registry = Arc::new(ProviderRegistry::new(providers));
    let bus = Arc::new(EventBus::default());
    let queue = GenerationQueue::start(
        QueueConfig {
            backoff_unit: Duration::from_millis(1),
            ..QueueConfig::default()
        },
        Arc::clone(&bus),
    );
    let service = AssetService::new(
        cache,
        registry,
        queue,
        bus,
        ServiceConfig {
            selection_mode: config.provider_mode,
            ..ServiceConfig::default()
        },
    );

    spritemill_api::build_router(AppState { service, config })
}

async fn get(app: Router, uri: &str) -> axum::response::Response {
    app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

async fn post_json(app: Router, uri: &str, body: Value) -> axum::response::Response {
    app.oneshot(
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap(),
    )
    .await
    .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

// ---------------------------------------------------------------------------
// Health & routing basics
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_check_returns_ok_with_json() {
    let dir = tempfile::tempdir().unwrap();
    let app = build_test_app(&dir).await;

    let response = get(app, "/health").await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn unknown_route_returns_404() {
    let dir = tempfile::tempdir().unwrap();
    let app = build_test_app(&dir).await;

    let response = get(app, "/this-route-does-not-exist").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Generation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn generate_waits_then_serves_from_cache() {
    let dir = tempfile::tempdir().unwrap();
    let app = build_test_app(&dir).await;

    let request = json!({
        "asset_type": "character",
        "description": "grizzled dwarf blacksmith",
        "size": { "width": 64, "height": 64 },
        "wait_for_result": true,
    });

    let response = post_json(app.clone(), "/api/generate", request.clone()).await;
    assert_eq!(response.status(), StatusCode::OK);

    let first = body_json(response).await;
    assert_eq!(first["data"]["status"], "complete");
    assert_eq!(first["data"]["cached"], false);
    assert_eq!(first["data"]["provider"], "procedural");

    let response = post_json(app, "/api/generate", request).await;
    let second = body_json(response).await;
    assert_eq!(second["data"]["status"], "ready");
    assert_eq!(second["data"]["cached"], true);
    assert_eq!(second["data"]["url"], first["data"]["url"]);
}

#[tokio::test]
async fn generate_without_wait_returns_queued_job() {
    let dir = tempfile::tempdir().unwrap();
    let app = build_test_app(&dir).await;

    let response = post_json(
        app,
        "/api/generate",
        json!({
            "asset_type": "monster",
            "description": "cave slime",
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["data"]["status"], "queued");
    assert!(json["data"]["job_id"].is_string());
    assert_eq!(
        json["data"]["placeholder_url"],
        "/assets/placeholders/monster.png"
    );
}

#[tokio::test]
async fn invalid_size_returns_validation_error() {
    let dir = tempfile::tempdir().unwrap();
    let app = build_test_app(&dir).await;

    let response = post_json(
        app,
        "/api/generate",
        json!({
            "asset_type": "character",
            "description": "dwarf",
            "size": { "width": 999, "height": 999 },
            "wait_for_result": true,
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = body_json(response).await;
    assert_eq!(json["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn pregenerate_is_accepted() {
    let dir = tempfile::tempdir().unwrap();
    let app = build_test_app(&dir).await;

    let response = post_json(
        app,
        "/api/pregenerate",
        json!([
            { "asset_type": "character", "description": "town guard" },
            { "asset_type": "effect", "description": "spark burst" },
        ]),
    )
    .await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    let json = body_json(response).await;
    assert_eq!(json["data"]["accepted"], 2);
}

// ---------------------------------------------------------------------------
// Jobs
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unknown_job_returns_404() {
    let dir = tempfile::tempdir().unwrap();
    let app = build_test_app(&dir).await;

    let response = get(
        app,
        "/api/jobs/00000000-0000-0000-0000-000000000000",
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let json = body_json(response).await;
    assert_eq!(json["code"], "NOT_FOUND");
}

// ---------------------------------------------------------------------------
// Queue & cache surfaces
// ---------------------------------------------------------------------------

#[tokio::test]
async fn queue_stats_exposes_counters() {
    let dir = tempfile::tempdir().unwrap();
    let app = build_test_app(&dir).await;

    let response = get(app, "/api/queue/stats").await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert!(json["data"]["pending"].is_number());
    assert!(json["data"]["active"].is_number());
    assert!(json["data"]["completed"].is_number());
    assert!(json["data"]["failed"].is_number());
    assert!(json["data"]["size"].is_number());
}

#[tokio::test]
async fn cache_stats_and_search_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let app = build_test_app(&dir).await;

    // Populate the cache with one synchronous generation.
    let response = post_json(
        app.clone(),
        "/api/generate",
        json!({
            "asset_type": "character",
            "description": "dwarf blacksmith",
            "wait_for_result": true,
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = get(app.clone(), "/api/cache/stats").await;
    let stats = body_json(response).await;
    assert_eq!(stats["data"]["total_entries"], 1);

    let response = get(app.clone(), "/api/cache/search?q=dwarf+blacksmith").await;
    let results = body_json(response).await;
    assert_eq!(results["data"].as_array().unwrap().len(), 1);

    let response = get(app, "/api/cache/search?q=dwarf&type=not-a-type").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn cache_cleanup_reports_removed_count() {
    let dir = tempfile::tempdir().unwrap();
    let app = build_test_app(&dir).await;

    let response = post_json(app, "/api/cache/cleanup", json!(null)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["data"]["removed"], 0);
}

#[tokio::test]
async fn queue_pause_and_resume_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let app = build_test_app(&dir).await;

    let response = post_json(app.clone(), "/api/queue/pause", json!(null)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["paused"], true);

    let response = post_json(app, "/api/queue/resume", json!(null)).await;
    assert_eq!(body_json(response).await["data"]["paused"], false);
}
