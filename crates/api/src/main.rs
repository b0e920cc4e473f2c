use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use spritemill_api::config::ServerConfig;
use spritemill_api::state::AppState;
use spritemill_cache::{AssetCache, CacheConfig};
use spritemill_events::EventBus;
use spritemill_pipeline::{AssetService, ServiceConfig};
use spritemill_providers::{
    DiffusionProvider, GenerationProvider, PixelLabProvider, ProceduralProvider, ProviderRegistry,
};
use spritemill_queue::{GenerationQueue, QueueConfig};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "spritemill_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Arc::new(ServerConfig::from_env());

    let cache = Arc::new(
        AssetCache::open(
            CacheConfig::new(&config.cache_dir)
                .with_ttl(Duration::from_secs(config.cache_ttl_secs)),
        )
        .await
        .expect("Failed to open asset cache"),
    );

    let providers: Vec<Arc<dyn GenerationProvider>> = vec![
        Arc::new(PixelLabProvider::new(
            config.pixellab_api_url.clone(),
            config.pixellab_api_key.clone(),
        )),
        Arc::new(DiffusionProvider::new(config.diffusion_api_url.clone())),
        Arc::new(ProceduralProvider::new()),
    ];
    let registry = Arc::new(ProviderRegistry::new(providers));
    for snapshot in registry.snapshots() {
        tracing::info!(
            provider = %snapshot.id,
            available = snapshot.available,
            "Provider registered",
        );
    }

    let bus = Arc::new(EventBus::default());
    let queue = GenerationQueue::start(
        QueueConfig {
            concurrency: config.generation_concurrency,
            max_retries: config.generation_max_retries,
            attempt_timeout: Duration::from_secs(config.generation_timeout_secs),
            ..QueueConfig::default()
        },
        Arc::clone(&bus),
    );

    let service = AssetService::new(
        cache,
        registry,
        Arc::clone(&queue),
        bus,
        ServiceConfig {
            selection_mode: config.provider_mode,
            ..ServiceConfig::default()
        },
    );

    let app = spritemill_api::build_router(AppState {
        service,
        config: Arc::clone(&config),
    });

    let addr = SocketAddr::new(config.host.parse().expect("Invalid HOST"), config.port);
    tracing::info!("Starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind listener");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    queue.shutdown();
    tracing::info!("Server stopped");
}

/// Resolve on Ctrl-C / SIGTERM.
async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl-C handler");
    tracing::info!("Shutdown signal received");
}
