//! The unit of generation work: select → generate → post-process →
//! cache-write.
//!
//! [`GenerationExecutor`] is invoked directly for synchronous requests
//! and through the queue (as its [`JobExecutor`]) for everything else,
//! so both paths share identical semantics.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;

use spritemill_cache::AssetCache;
use spritemill_core::cache_key::generate_cache_key;
use spritemill_core::selection::SelectionMode;
use spritemill_core::types::{GenerationResult, ResolvedRequest};
use spritemill_providers::ProviderRegistry;
use spritemill_queue::{ExecutionError, GenerationJob, JobExecutor};

use crate::error::GenerateError;
use crate::postprocess;

/// Runs one generation end to end.
pub struct GenerationExecutor {
    cache: Arc<AssetCache>,
    registry: Arc<ProviderRegistry>,
    mode: SelectionMode,
    saturation_threshold: usize,
}

impl GenerationExecutor {
    pub fn new(
        cache: Arc<AssetCache>,
        registry: Arc<ProviderRegistry>,
        mode: SelectionMode,
        saturation_threshold: usize,
    ) -> Self {
        Self {
            cache,
            registry,
            mode,
            saturation_threshold,
        }
    }

    /// Generate, post-process, and cache one asset.
    ///
    /// A cache-write failure is absorbed: the result is still returned
    /// with the URL the asset would have had, and the next identical
    /// request simply misses and regenerates.
    pub async fn run(&self, request: &ResolvedRequest) -> Result<GenerationResult, GenerateError> {
        let provider = self.registry.select(
            self.mode,
            request.asset_type,
            self.saturation_threshold,
        )?;

        let started = Instant::now();
        let raw = {
            let _inflight = self.registry.begin_generation(provider.id());
            provider
                .generate(request)
                .await
                .map_err(|e| GenerateError::Generation(e.to_string()))?
        };

        let processed = postprocess::normalize(
            &raw,
            request.size,
            postprocess::should_quantize(request.asset_type),
        )
        .map_err(|e| GenerateError::Generation(e.to_string()))?;

        let cache_key = generate_cache_key(request.asset_type, &request.description, request.size);

        let (url, local_path) = match self
            .cache
            .set(
                &cache_key,
                request.asset_type,
                &request.description,
                &processed,
                request.size,
                provider.id(),
            )
            .await
        {
            Ok(entry) => (entry.url, entry.file_path),
            Err(e) => {
                // Degrade to "no caching available" rather than failing
                // the caller's request.
                tracing::warn!(
                    cache_key = %cache_key,
                    error = %e,
                    "Failed to write generated asset to cache",
                );
                let fallback = self
                    .cache
                    .root()
                    .join(request.asset_type.as_str())
                    .join(format!("{cache_key}.png"));
                (
                    format!("/assets/{}/{cache_key}.png", request.asset_type),
                    fallback.to_string_lossy().into_owned(),
                )
            }
        };

        let generation_time_ms = started.elapsed().as_millis() as u64;
        tracing::info!(
            cache_key = %cache_key,
            asset_type = %request.asset_type,
            provider = %provider.id(),
            generation_time_ms,
            "Asset generated",
        );

        Ok(GenerationResult {
            url,
            local_path,
            cache_key,
            width: request.size.width,
            height: request.size.height,
            provider: provider.id(),
            generation_time_ms,
            cached: false,
        })
    }
}

#[async_trait]
impl JobExecutor for GenerationExecutor {
    async fn execute(&self, job: &GenerationJob) -> Result<GenerationResult, ExecutionError> {
        self.run(&job.request).await.map_err(|e| match e {
            // Configuration problems cannot be fixed by retrying.
            GenerateError::Selection(_) | GenerateError::InvalidRequest(_) => {
                ExecutionError::Fatal(e.to_string())
            }
            GenerateError::Generation(message) => ExecutionError::Transient(message),
        })
    }
}
