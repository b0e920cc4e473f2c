//! The orchestrator: the single entry point callers use.
//!
//! Constructed once at process start and injected wherever needed —
//! there is no module-level singleton. All collaborators arrive through
//! the constructor so tests can wire in mock providers and temp caches.

use std::sync::Arc;

use uuid::Uuid;

use spritemill_cache::{AssetCache, CacheEntry, CacheStats};
use spritemill_core::cache_key::generate_cache_key;
use spritemill_core::selection::{SelectionMode, DEFAULT_SATURATION_THRESHOLD};
use spritemill_core::types::{AssetType, GenerationRequest, Priority, QueueStats};
use spritemill_core::validation::resolve_request;
use spritemill_events::{AssetEvent, EventBus};
use spritemill_providers::ProviderRegistry;
use spritemill_queue::{GenerationJob, GenerationQueue, JobExecutor};

use crate::error::GenerateError;
use crate::executor::GenerationExecutor;
use crate::response::GenerateResponse;

/// Orchestrator configuration.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub selection_mode: SelectionMode,
    pub saturation_threshold: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            selection_mode: SelectionMode::Hybrid,
            saturation_threshold: DEFAULT_SATURATION_THRESHOLD,
        }
    }
}

/// The asset generation service.
pub struct AssetService {
    cache: Arc<AssetCache>,
    queue: Arc<GenerationQueue>,
    bus: Arc<EventBus>,
    executor: Arc<GenerationExecutor>,
}

impl AssetService {
    pub fn new(
        cache: Arc<AssetCache>,
        registry: Arc<ProviderRegistry>,
        queue: Arc<GenerationQueue>,
        bus: Arc<EventBus>,
        config: ServiceConfig,
    ) -> Arc<Self> {
        let executor = Arc::new(GenerationExecutor::new(
            Arc::clone(&cache),
            registry,
            config.selection_mode,
            config.saturation_threshold,
        ));
        Arc::new(Self {
            cache,
            queue,
            bus,
            executor,
        })
    }

    /// Generate (or fetch) one asset.
    ///
    /// Cache hit → [`GenerateResponse::Ready`] without touching any
    /// provider. Miss with `wait_for_result` → synchronous generation →
    /// [`GenerateResponse::Complete`]. Miss without → enqueue →
    /// [`GenerateResponse::Queued`] with a placeholder the caller can
    /// render meanwhile.
    pub async fn generate(
        &self,
        request: GenerationRequest,
    ) -> Result<GenerateResponse, GenerateError> {
        let wait_for_result = request.wait_for_result;
        let resolved = resolve_request(request)?;

        let cache_key =
            generate_cache_key(resolved.asset_type, &resolved.description, resolved.size);

        if let Some(entry) = self.cache.get(&cache_key).await {
            self.bus.publish(AssetEvent::CacheHit {
                cache_key: cache_key.clone(),
            });
            tracing::debug!(cache_key = %cache_key, "Cache hit, serving existing asset");
            return Ok(GenerateResponse::Ready {
                url: entry.url,
                cache_key,
                width: entry.width,
                height: entry.height,
                cached: true,
            });
        }

        self.bus.publish(AssetEvent::CacheMiss {
            cache_key: cache_key.clone(),
        });

        if wait_for_result {
            let result = self.executor.run(&resolved).await?;
            return Ok(GenerateResponse::Complete { result });
        }

        let placeholder_url = placeholder_url(resolved.asset_type);
        let (job, handle) = self
            .queue
            .enqueue(resolved, self.executor.clone() as Arc<dyn JobExecutor>)
            .await;
        // The caller polls or subscribes; nobody waits on the handle.
        drop(handle);

        let estimated_wait_ms = self
            .queue
            .estimated_wait_ms(job.id)
            .await
            .unwrap_or_default();

        Ok(GenerateResponse::Queued {
            job_id: job.id,
            estimated_wait_ms,
            placeholder_url,
        })
    }

    /// Warm the cache ahead of need: fire-and-forget low-priority
    /// enqueues. Failures are logged, never surfaced; already-cached
    /// requests are skipped outright.
    pub async fn pregenerate(&self, requests: Vec<GenerationRequest>) {
        for mut request in requests {
            request.priority = Priority::Low;
            request.wait_for_result = false;

            let resolved = match resolve_request(request) {
                Ok(resolved) => resolved,
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping invalid pregeneration request");
                    continue;
                }
            };

            let cache_key =
                generate_cache_key(resolved.asset_type, &resolved.description, resolved.size);
            if self.cache.has(&cache_key).await {
                continue;
            }

            let (job, handle) = self
                .queue
                .enqueue(resolved, self.executor.clone() as Arc<dyn JobExecutor>)
                .await;
            drop(handle);
            tracing::debug!(job_id = %job.id, cache_key = %cache_key, "Pregeneration queued");
        }
    }

    /// Job record lookup (available during the retention window).
    pub async fn get_job_status(&self, job_id: Uuid) -> Option<GenerationJob> {
        self.queue.get_job(job_id).await
    }

    /// Cancel a not-yet-started job.
    pub async fn cancel_job(&self, job_id: Uuid) -> bool {
        self.queue.cancel(job_id).await
    }

    pub async fn queue_stats(&self) -> QueueStats {
        self.queue.stats().await
    }

    pub fn pause_queue(&self) {
        self.queue.pause();
    }

    pub fn resume_queue(&self) {
        self.queue.resume();
    }

    pub async fn clear_queue(&self) -> usize {
        self.queue.clear().await
    }

    pub async fn cache_stats(&self) -> CacheStats {
        self.cache.stats().await
    }

    pub async fn search_cache(
        &self,
        query: &str,
        asset_type: Option<AssetType>,
        limit: Option<usize>,
    ) -> Vec<CacheEntry> {
        self.cache.search(query, asset_type, limit).await
    }

    /// Proactively purge stale cache entries; returns the count removed.
    pub async fn cleanup_cache(&self) -> usize {
        match self.cache.cleanup().await {
            Ok(count) => count,
            Err(e) => {
                tracing::warn!(error = %e, "Cache cleanup failed");
                0
            }
        }
    }

    /// Subscribe to lifecycle events.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<AssetEvent> {
        self.bus.subscribe()
    }
}

/// Placeholder asset a caller can render while a job is queued.
pub fn placeholder_url(asset_type: AssetType) -> String {
    format!("/assets/placeholders/{asset_type}.png")
}
