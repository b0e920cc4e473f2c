//! The three-way response of the `generate` entry point.

use serde::Serialize;
use uuid::Uuid;

use spritemill_core::types::GenerationResult;

/// Outcome of a `generate` call.
///
/// Serializes with a `status` tag so API clients can switch on
/// `"ready"` / `"complete"` / `"queued"`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum GenerateResponse {
    /// Cache hit: the asset already exists, no provider was touched.
    Ready {
        url: String,
        cache_key: String,
        width: u32,
        height: u32,
        cached: bool,
    },

    /// Generated synchronously (`wait_for_result` was set).
    Complete {
        #[serde(flatten)]
        result: GenerationResult,
    },

    /// Enqueued for asynchronous generation.
    Queued {
        job_id: Uuid,
        estimated_wait_ms: u64,
        /// Asset the caller can render while waiting.
        placeholder_url: String,
    },
}
