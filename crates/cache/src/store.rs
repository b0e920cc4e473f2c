//! The asset cache store.
//!
//! Layout on disk, under the configured root:
//!
//! ```text
//! <root>/index.json          — the single source of truth for what exists
//! <root>/character/<key>.png — one subdirectory per asset type
//! <root>/monster/<key>.png
//! ...
//! ```
//!
//! The index is rewritten atomically (write temp file, then rename) after
//! every mutation so it can be rebuilt after a crash from the last
//! successful write. A corrupt index or a missing backing file is treated
//! as a cache miss, never as a fatal error.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use spritemill_core::cache_key::normalize_description;
use spritemill_core::search::{clamp_limit, overlap_score};
use spritemill_core::types::{AssetSize, AssetType, ProviderId};

use crate::entry::{CacheEntry, CacheStats};

/// Default time-to-live for cache entries (7 days).
pub const DEFAULT_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Name of the index file under the cache root.
const INDEX_FILE: &str = "index.json";

// ---------------------------------------------------------------------------
// Configuration & errors
// ---------------------------------------------------------------------------

/// Cache store configuration.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Root directory of the asset tree and index file.
    pub root: PathBuf,
    /// Age beyond which an entry is stale and purged.
    pub ttl: Duration,
    /// Prefix for public asset URLs, e.g. `/assets`.
    pub url_prefix: String,
}

impl CacheConfig {
    /// Config with the default TTL and `/assets` URL prefix.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ttl: DEFAULT_TTL,
            url_prefix: "/assets".to_string(),
        }
    }

    /// Override the TTL.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }
}

/// Errors from cache I/O.
///
/// Callers are expected to absorb these: a read error degrades to a
/// cache miss, a write error is logged and the in-memory result is
/// still returned to the caller.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cache index serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

// ---------------------------------------------------------------------------
// Index file format
// ---------------------------------------------------------------------------

/// On-disk shape of `index.json`.
#[derive(Debug, Default, Serialize, Deserialize)]
struct IndexFile {
    entries: Vec<CacheEntry>,
}

/// In-memory mutable state guarded by one lock.
#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<String, CacheEntry>,
    hits: u64,
    misses: u64,
}

// ---------------------------------------------------------------------------
// AssetCache
// ---------------------------------------------------------------------------

/// Content-addressable, TTL-bound store of generated assets.
pub struct AssetCache {
    config: CacheConfig,
    state: RwLock<CacheState>,
}

/// True when an entry is older than the configured TTL.
fn is_expired(entry: &CacheEntry, ttl: Duration, now: DateTime<Utc>) -> bool {
    now.signed_duration_since(entry.created_at).num_seconds() > ttl.as_secs() as i64
}

impl AssetCache {
    /// Open (or create) a cache at the configured root.
    ///
    /// A missing index starts empty; a corrupt index is logged and
    /// discarded rather than failing startup.
    pub async fn open(config: CacheConfig) -> Result<Self, CacheError> {
        tokio::fs::create_dir_all(&config.root).await?;

        let index_path = config.root.join(INDEX_FILE);
        let entries = match tokio::fs::read(&index_path).await {
            Ok(bytes) => match serde_json::from_slice::<IndexFile>(&bytes) {
                Ok(index) => index
                    .entries
                    .into_iter()
                    .map(|e| (e.cache_key.clone(), e))
                    .collect(),
                Err(e) => {
                    tracing::warn!(
                        path = %index_path.display(),
                        error = %e,
                        "Cache index is corrupt, starting empty",
                    );
                    HashMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(e.into()),
        };

        tracing::info!(
            root = %config.root.display(),
            entries = entries.len(),
            "Asset cache opened",
        );

        Ok(Self {
            config,
            state: RwLock::new(CacheState {
                entries,
                hits: 0,
                misses: 0,
            }),
        })
    }

    /// Root directory of the asset tree (served as static files).
    pub fn root(&self) -> &Path {
        &self.config.root
    }

    /// Check whether a live entry exists for `key`.
    ///
    /// Side effect: an expired entry, or one whose backing file has
    /// vanished, is purged from the index (self-healing).
    pub async fn has(&self, key: &str) -> bool {
        self.live_entry(key, false).await.is_some()
    }

    /// Fetch the entry for `key`, bumping access metadata and hit/miss
    /// counters.
    pub async fn get(&self, key: &str) -> Option<CacheEntry> {
        self.live_entry(key, true).await
    }

    /// Store generated bytes and record an index entry.
    ///
    /// The file lands in a type-partitioned subdirectory; the index is
    /// persisted before returning.
    #[allow(clippy::too_many_arguments)]
    pub async fn set(
        &self,
        key: &str,
        asset_type: AssetType,
        description: &str,
        bytes: &[u8],
        size: AssetSize,
        provider: ProviderId,
    ) -> Result<CacheEntry, CacheError> {
        let dir = self.config.root.join(asset_type.as_str());
        tokio::fs::create_dir_all(&dir).await?;

        let file_path = dir.join(format!("{key}.png"));
        tokio::fs::write(&file_path, bytes).await?;

        let now = Utc::now();
        let entry = CacheEntry {
            cache_key: key.to_string(),
            asset_type,
            description: description.to_string(),
            normalized_description: normalize_description(description),
            file_path: file_path.to_string_lossy().into_owned(),
            url: format!("{}/{}/{key}.png", self.config.url_prefix, asset_type),
            width: size.width,
            height: size.height,
            provider,
            created_at: now,
            last_accessed_at: now,
            access_count: 0,
            size_bytes: bytes.len() as u64,
        };

        let mut state = self.state.write().await;
        state.entries.insert(key.to_string(), entry.clone());
        self.persist(&state).await?;

        tracing::debug!(
            cache_key = %key,
            asset_type = %asset_type,
            size_bytes = entry.size_bytes,
            provider = %provider,
            "Cache entry stored",
        );

        Ok(entry)
    }

    /// Remove both the backing file and the index entry.
    ///
    /// Returns true when an entry existed.
    pub async fn delete(&self, key: &str) -> Result<bool, CacheError> {
        let mut state = self.state.write().await;
        let Some(entry) = state.entries.remove(key) else {
            return Ok(false);
        };
        remove_file_if_present(&entry.file_path).await;
        self.persist(&state).await?;
        Ok(true)
    }

    /// Search entries by lexical overlap with `query`.
    ///
    /// Zero-score entries are dropped; results are sorted by descending
    /// score and truncated to `limit` (clamped to sane bounds).
    pub async fn search(
        &self,
        query: &str,
        asset_type: Option<AssetType>,
        limit: Option<usize>,
    ) -> Vec<CacheEntry> {
        let normalized_query = normalize_description(query);
        let limit = clamp_limit(limit);

        let state = self.state.read().await;
        let mut scored: Vec<(f64, &CacheEntry)> = state
            .entries
            .values()
            .filter(|e| asset_type.map_or(true, |ty| e.asset_type == ty))
            .filter_map(|e| {
                let score = overlap_score(&normalized_query, &e.normalized_description);
                (score > 0.0).then_some((score, e))
            })
            .collect();

        scored.sort_by(|a, b| b.0.total_cmp(&a.0));
        scored
            .into_iter()
            .take(limit)
            .map(|(_, e)| e.clone())
            .collect()
    }

    /// Proactively delete every entry older than the TTL.
    ///
    /// Returns the number of entries removed.
    pub async fn cleanup(&self) -> Result<usize, CacheError> {
        let now = Utc::now();
        let mut state = self.state.write().await;

        let stale: Vec<String> = state
            .entries
            .values()
            .filter(|e| is_expired(e, self.config.ttl, now))
            .map(|e| e.cache_key.clone())
            .collect();

        for key in &stale {
            if let Some(entry) = state.entries.remove(key) {
                remove_file_if_present(&entry.file_path).await;
            }
        }

        if !stale.is_empty() {
            self.persist(&state).await?;
            tracing::info!(removed = stale.len(), "Cache cleanup removed stale entries");
        }

        Ok(stale.len())
    }

    /// Aggregate statistics for the lifetime of this store instance.
    pub async fn stats(&self) -> CacheStats {
        let state = self.state.read().await;

        let mut entries_by_type: HashMap<String, usize> = HashMap::new();
        for entry in state.entries.values() {
            *entries_by_type
                .entry(entry.asset_type.as_str().to_string())
                .or_default() += 1;
        }

        let lookups = state.hits + state.misses;
        CacheStats {
            total_entries: state.entries.len(),
            total_size_bytes: state.entries.values().map(|e| e.size_bytes).sum(),
            hits: state.hits,
            misses: state.misses,
            hit_rate: if lookups == 0 {
                0.0
            } else {
                state.hits as f64 / lookups as f64
            },
            entries_by_type,
        }
    }

    // ---- private helpers ----

    /// Shared lookup path for `has`/`get`.
    ///
    /// Purges expired or file-missing entries; when `count` is set the
    /// hit/miss counters and access metadata are updated.
    async fn live_entry(&self, key: &str, count: bool) -> Option<CacheEntry> {
        let now = Utc::now();
        let mut state = self.state.write().await;

        let miss = |state: &mut CacheState| {
            if count {
                state.misses += 1;
            }
        };

        let Some(entry) = state.entries.get(key) else {
            miss(&mut state);
            return None;
        };

        if is_expired(entry, self.config.ttl, now) {
            tracing::debug!(cache_key = %key, "Cache entry expired, purging");
            let removed = state.entries.remove(key);
            if let Some(entry) = removed {
                remove_file_if_present(&entry.file_path).await;
            }
            self.persist_logged(&state).await;
            miss(&mut state);
            return None;
        }

        if !file_exists(&entry.file_path).await {
            tracing::warn!(
                cache_key = %key,
                file = %entry.file_path,
                "Cache entry backing file vanished, purging index entry",
            );
            state.entries.remove(key);
            self.persist_logged(&state).await;
            miss(&mut state);
            return None;
        }

        if count {
            state.hits += 1;
            let entry = state.entries.get_mut(key)?;
            entry.access_count += 1;
            entry.last_accessed_at = now;
            let snapshot = entry.clone();
            self.persist_logged(&state).await;
            Some(snapshot)
        } else {
            state.entries.get(key).cloned()
        }
    }

    /// Atomically rewrite the index file: write a temp file, then rename
    /// over the old index.
    async fn persist(&self, state: &CacheState) -> Result<(), CacheError> {
        let index = IndexFile {
            entries: state.entries.values().cloned().collect(),
        };
        let bytes = serde_json::to_vec_pretty(&index)?;

        let final_path = self.config.root.join(INDEX_FILE);
        let tmp_path = self.config.root.join(format!("{INDEX_FILE}.tmp"));
        tokio::fs::write(&tmp_path, &bytes).await?;
        tokio::fs::rename(&tmp_path, &final_path).await?;
        Ok(())
    }

    /// Persist, logging failures instead of surfacing them (used on read
    /// paths where an index-write failure must not fail the lookup).
    async fn persist_logged(&self, state: &CacheState) {
        if let Err(e) = self.persist(state).await {
            tracing::warn!(error = %e, "Failed to persist cache index");
        }
    }
}

async fn file_exists(path: &str) -> bool {
    tokio::fs::try_exists(path).await.unwrap_or(false)
}

async fn remove_file_if_present(path: &str) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!(file = %path, error = %e, "Failed to remove cached file");
        }
    }
}

#[cfg(test)]
impl AssetCache {
    /// Test helper: rewrite an entry's creation time to simulate age.
    pub(crate) async fn backdate_entry(&self, key: &str, created_at: DateTime<Utc>) {
        let mut state = self.state.write().await;
        if let Some(entry) = state.entries.get_mut(key) {
            entry.created_at = created_at;
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    const PNG_STUB: &[u8] = b"not-a-real-png-but-bytes-are-bytes";

    async fn open_cache(dir: &tempfile::TempDir) -> AssetCache {
        AssetCache::open(CacheConfig::new(dir.path()))
            .await
            .expect("cache should open")
    }

    async fn store_dwarf(cache: &AssetCache) -> CacheEntry {
        cache
            .set(
                "abcd1234abcd1234",
                AssetType::Character,
                "grizzled dwarf blacksmith",
                PNG_STUB,
                AssetSize::new(64, 64),
                ProviderId::PixelLab,
            )
            .await
            .expect("set should succeed")
    }

    #[tokio::test]
    async fn set_then_get_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let cache = open_cache(&dir).await;

        let stored = store_dwarf(&cache).await;
        assert_eq!(stored.normalized_description, "grizzled dwarf blacksmith");
        assert_eq!(stored.size_bytes, PNG_STUB.len() as u64);

        let fetched = cache.get("abcd1234abcd1234").await.expect("should hit");
        assert_eq!(fetched.cache_key, stored.cache_key);
        assert_eq!(fetched.url, "/assets/character/abcd1234abcd1234.png");
        assert_eq!(fetched.access_count, 1);
    }

    #[tokio::test]
    async fn get_miss_increments_miss_counter() {
        let dir = tempfile::tempdir().unwrap();
        let cache = open_cache(&dir).await;

        assert!(cache.get("missing").await.is_none());

        let stats = cache.stats().await;
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.hit_rate, 0.0);
    }

    #[tokio::test]
    async fn hits_bump_access_metadata_and_hit_rate() {
        let dir = tempfile::tempdir().unwrap();
        let cache = open_cache(&dir).await;
        store_dwarf(&cache).await;

        cache.get("abcd1234abcd1234").await.unwrap();
        let second = cache.get("abcd1234abcd1234").await.unwrap();
        assert_eq!(second.access_count, 2);

        cache.get("nope").await;

        let stats = cache.stats().await;
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);
        assert!((stats.hit_rate - 2.0 / 3.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn has_does_not_count_as_lookup() {
        let dir = tempfile::tempdir().unwrap();
        let cache = open_cache(&dir).await;
        store_dwarf(&cache).await;

        assert!(cache.has("abcd1234abcd1234").await);
        assert!(!cache.has("missing").await);

        let stats = cache.stats().await;
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 0);
    }

    #[tokio::test]
    async fn expired_entry_is_purged_on_lookup() {
        let dir = tempfile::tempdir().unwrap();
        let cache = open_cache(&dir).await;
        let entry = store_dwarf(&cache).await;

        cache
            .backdate_entry(
                "abcd1234abcd1234",
                Utc::now() - ChronoDuration::days(30),
            )
            .await;

        assert!(!cache.has("abcd1234abcd1234").await);
        // The backing file is gone too.
        assert!(!tokio::fs::try_exists(&entry.file_path).await.unwrap());
        assert_eq!(cache.stats().await.total_entries, 0);
    }

    #[tokio::test]
    async fn vanished_file_is_treated_as_miss_and_purged() {
        let dir = tempfile::tempdir().unwrap();
        let cache = open_cache(&dir).await;
        let entry = store_dwarf(&cache).await;

        tokio::fs::remove_file(&entry.file_path).await.unwrap();

        assert!(cache.get("abcd1234abcd1234").await.is_none());
        assert_eq!(cache.stats().await.total_entries, 0);
    }

    #[tokio::test]
    async fn delete_removes_file_and_entry() {
        let dir = tempfile::tempdir().unwrap();
        let cache = open_cache(&dir).await;
        let entry = store_dwarf(&cache).await;

        assert!(cache.delete("abcd1234abcd1234").await.unwrap());
        assert!(!tokio::fs::try_exists(&entry.file_path).await.unwrap());
        assert!(!cache.delete("abcd1234abcd1234").await.unwrap());
    }

    #[tokio::test]
    async fn cleanup_removes_only_stale_entries() {
        let dir = tempfile::tempdir().unwrap();
        let cache = open_cache(&dir).await;

        store_dwarf(&cache).await;
        cache
            .set(
                "fresh000fresh000",
                AssetType::Monster,
                "cave slime",
                PNG_STUB,
                AssetSize::new(96, 96),
                ProviderId::Procedural,
            )
            .await
            .unwrap();

        cache
            .backdate_entry(
                "abcd1234abcd1234",
                Utc::now() - ChronoDuration::days(30),
            )
            .await;

        let removed = cache.cleanup().await.unwrap();
        assert_eq!(removed, 1);
        assert!(cache.has("fresh000fresh000").await);
        assert!(!cache.has("abcd1234abcd1234").await);
    }

    #[tokio::test]
    async fn index_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let cache = open_cache(&dir).await;
            store_dwarf(&cache).await;
        }

        let reopened = open_cache(&dir).await;
        let entry = reopened.get("abcd1234abcd1234").await.expect("persisted");
        assert_eq!(entry.description, "grizzled dwarf blacksmith");
    }

    #[tokio::test]
    async fn corrupt_index_starts_empty_instead_of_failing() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join("index.json"), b"{ not json !")
            .await
            .unwrap();

        let cache = open_cache(&dir).await;
        assert_eq!(cache.stats().await.total_entries, 0);
    }

    #[tokio::test]
    async fn search_ranks_by_overlap() {
        let dir = tempfile::tempdir().unwrap();
        let cache = open_cache(&dir).await;

        cache
            .set(
                "key1",
                AssetType::Character,
                "Dwarf Blacksmith!",
                PNG_STUB,
                AssetSize::new(64, 64),
                ProviderId::PixelLab,
            )
            .await
            .unwrap();
        cache
            .set(
                "key2",
                AssetType::Character,
                "dwarf warrior with axe",
                PNG_STUB,
                AssetSize::new(64, 64),
                ProviderId::PixelLab,
            )
            .await
            .unwrap();
        cache
            .set(
                "key3",
                AssetType::Character,
                "elf ranger",
                PNG_STUB,
                AssetSize::new(64, 64),
                ProviderId::PixelLab,
            )
            .await
            .unwrap();

        let results = cache.search("dwarf blacksmith", None, None).await;
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].cache_key, "key1");
        assert_eq!(results[1].cache_key, "key2");
    }

    #[tokio::test]
    async fn search_filters_by_type_and_limit() {
        let dir = tempfile::tempdir().unwrap();
        let cache = open_cache(&dir).await;

        cache
            .set(
                "char",
                AssetType::Character,
                "stone golem",
                PNG_STUB,
                AssetSize::new(64, 64),
                ProviderId::PixelLab,
            )
            .await
            .unwrap();
        cache
            .set(
                "mons",
                AssetType::Monster,
                "stone golem",
                PNG_STUB,
                AssetSize::new(96, 96),
                ProviderId::PixelLab,
            )
            .await
            .unwrap();

        let only_monsters = cache
            .search("stone golem", Some(AssetType::Monster), None)
            .await;
        assert_eq!(only_monsters.len(), 1);
        assert_eq!(only_monsters[0].cache_key, "mons");

        let limited = cache.search("stone golem", None, Some(1)).await;
        assert_eq!(limited.len(), 1);
    }

    #[tokio::test]
    async fn stats_count_entries_by_type() {
        let dir = tempfile::tempdir().unwrap();
        let cache = open_cache(&dir).await;
        store_dwarf(&cache).await;
        cache
            .set(
                "mons",
                AssetType::Monster,
                "cave slime",
                PNG_STUB,
                AssetSize::new(96, 96),
                ProviderId::Procedural,
            )
            .await
            .unwrap();

        let stats = cache.stats().await;
        assert_eq!(stats.total_entries, 2);
        assert_eq!(stats.entries_by_type.get("character"), Some(&1));
        assert_eq!(stats.entries_by_type.get("monster"), Some(&1));
        assert_eq!(stats.total_size_bytes, 2 * PNG_STUB.len() as u64);
    }
}
