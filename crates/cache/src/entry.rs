//! Persisted cache records and aggregate statistics.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use spritemill_core::types::{AssetType, ProviderId};

/// One cached asset, as recorded in the index file.
///
/// An entry is created exactly once per distinct cache key, on first
/// successful generation; its access metadata is bumped on every hit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub cache_key: String,
    pub asset_type: AssetType,
    /// The original description as the caller phrased it.
    pub description: String,
    /// The normalized form used for key derivation and search.
    pub normalized_description: String,
    /// Filesystem path of the stored PNG.
    pub file_path: String,
    /// Public URL of the stored PNG.
    pub url: String,
    pub width: u32,
    pub height: u32,
    /// The backend that produced the asset.
    pub provider: ProviderId,
    pub created_at: DateTime<Utc>,
    pub last_accessed_at: DateTime<Utc>,
    pub access_count: u64,
    pub size_bytes: u64,
}

/// Aggregate cache statistics surfaced through the API.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStats {
    pub total_entries: usize,
    pub total_size_bytes: u64,
    pub hits: u64,
    pub misses: u64,
    /// `hits / (hits + misses)`, 0.0 before any lookup.
    pub hit_rate: f64,
    /// Entry counts keyed by asset type name.
    pub entries_by_type: HashMap<String, usize>,
}
