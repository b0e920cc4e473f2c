//! Request validation.
//!
//! Validation runs synchronously before any queueing: an invalid request
//! must never consume a queue slot or touch a provider.

use crate::error::CoreError;
use crate::types::{AssetSize, AssetType, GenerationRequest, ResolvedRequest};

/// Maximum description length in characters.
pub const MAX_DESCRIPTION_CHARS: usize = 500;

/// Validate a description: non-empty after trimming, bounded length.
pub fn validate_description(description: &str) -> Result<(), CoreError> {
    if description.trim().is_empty() {
        return Err(CoreError::Validation(
            "Description must not be empty".to_string(),
        ));
    }
    let chars = description.chars().count();
    if chars > MAX_DESCRIPTION_CHARS {
        return Err(CoreError::Validation(format!(
            "Description must not exceed {MAX_DESCRIPTION_CHARS} characters (got {chars})"
        )));
    }
    Ok(())
}

/// Validate that `size` is in the enumerated legal set for `asset_type`.
pub fn validate_size(asset_type: AssetType, size: AssetSize) -> Result<(), CoreError> {
    if asset_type.legal_sizes().contains(&size) {
        Ok(())
    } else {
        let legal = asset_type
            .legal_sizes()
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        Err(CoreError::Validation(format!(
            "Size {size} is not valid for asset type '{asset_type}'. Valid sizes: {legal}"
        )))
    }
}

/// Validate a request and resolve its effective size.
///
/// The returned [`ResolvedRequest`] is what flows through the queue and
/// the providers.
pub fn resolve_request(request: GenerationRequest) -> Result<ResolvedRequest, CoreError> {
    validate_description(&request.description)?;

    let size = request.size.unwrap_or_else(|| request.asset_type.default_size());
    validate_size(request.asset_type, size)?;

    Ok(ResolvedRequest {
        asset_type: request.asset_type,
        description: request.description,
        size,
        priority: request.priority,
        session_id: request.session_id,
        metadata: request.metadata,
    })
}
