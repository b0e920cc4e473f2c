//! The generation provider trait and shared error type.

use async_trait::async_trait;

use spritemill_core::types::{ProviderId, ResolvedRequest};

/// A pluggable generation backend.
///
/// Implementations turn a text description into raw image bytes. The
/// bytes are whatever the backend natively produces (PNG, JPEG, WebP);
/// the post-processor normalizes them before they reach the cache.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Stable identifier for this backend.
    fn id(&self) -> ProviderId;

    /// Credential/config sanity check — not a network round-trip
    /// guarantee. An unavailable provider is never selected.
    fn is_available(&self) -> bool;

    /// Generate raw image bytes for the request.
    async fn generate(&self, request: &ResolvedRequest) -> Result<Vec<u8>, ProviderError>;

    /// Rough wall-clock estimate for one generation, in milliseconds.
    fn estimate_time_ms(&self, request: &ResolvedRequest) -> u64;

    /// Rough cost estimate for one generation, in USD.
    fn estimate_cost(&self, request: &ResolvedRequest) -> f64;
}

/// Errors from a generation backend.
///
/// All variants are treated as transient by the queue's retry policy —
/// configuration problems are caught earlier, at selection time.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The backend returned a non-2xx status code.
    #[error("Provider API error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// The backend answered 2xx but the payload was not usable.
    #[error("Malformed provider response: {0}")]
    Decode(String),

    /// The backend was invoked without its required configuration.
    #[error("Provider '{0}' is not configured")]
    NotConfigured(ProviderId),
}
