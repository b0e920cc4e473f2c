//! Pipeline-level error type.

use spritemill_core::error::CoreError;
use spritemill_core::selection::SelectionError;

/// Errors surfaced by [`crate::AssetService::generate`].
#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    /// The request failed validation; rejected before any queueing.
    #[error(transparent)]
    InvalidRequest(#[from] CoreError),

    /// Provider selection failed (fixed provider unavailable, or no
    /// provider available at all). Never retried.
    #[error(transparent)]
    Selection(#[from] SelectionError),

    /// The provider call or post-processing failed.
    #[error("Generation failed: {0}")]
    Generation(String),
}
