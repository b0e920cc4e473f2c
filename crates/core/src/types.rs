//! Asset types, sizes, priorities, and request/result records.
//!
//! These are the vocabulary shared by every crate in the workspace. All
//! enums serialize as lowercase strings so they round-trip cleanly through
//! the HTTP API and the cache index file.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// AssetSize
// ---------------------------------------------------------------------------

/// A width x height pair in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssetSize {
    pub width: u32,
    pub height: u32,
}

impl AssetSize {
    /// Create a size. `const` so the legal-size tables can be static.
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl fmt::Display for AssetSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

// ---------------------------------------------------------------------------
// AssetType
// ---------------------------------------------------------------------------

/// The category of generated image. Each type has its own enumerated set
/// of legal sizes and a canonical default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetType {
    Character,
    Monster,
    Scene,
    Room,
    Effect,
}

/// Legal sizes for character portraits.
pub const CHARACTER_SIZES: &[AssetSize] = &[
    AssetSize::new(32, 32),
    AssetSize::new(48, 48),
    AssetSize::new(64, 64),
    AssetSize::new(96, 96),
];

/// Legal sizes for monsters.
pub const MONSTER_SIZES: &[AssetSize] = &[
    AssetSize::new(32, 32),
    AssetSize::new(64, 64),
    AssetSize::new(96, 96),
    AssetSize::new(128, 128),
];

/// Legal sizes for scene backdrops.
pub const SCENE_SIZES: &[AssetSize] = &[
    AssetSize::new(320, 180),
    AssetSize::new(640, 360),
    AssetSize::new(960, 540),
];

/// Legal sizes for room tiles.
pub const ROOM_SIZES: &[AssetSize] = &[AssetSize::new(256, 256), AssetSize::new(512, 512)];

/// Legal sizes for effect sprites.
pub const EFFECT_SIZES: &[AssetSize] = &[
    AssetSize::new(16, 16),
    AssetSize::new(32, 32),
    AssetSize::new(64, 64),
];

impl AssetType {
    /// All asset types, in display order.
    pub const ALL: &'static [AssetType] = &[
        Self::Character,
        Self::Monster,
        Self::Scene,
        Self::Room,
        Self::Effect,
    ];

    /// Lowercase name as used in cache keys, directory names, and the API.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Character => "character",
            Self::Monster => "monster",
            Self::Scene => "scene",
            Self::Room => "room",
            Self::Effect => "effect",
        }
    }

    /// Parse from the lowercase name.
    pub fn from_name(name: &str) -> Result<Self, CoreError> {
        match name {
            "character" => Ok(Self::Character),
            "monster" => Ok(Self::Monster),
            "scene" => Ok(Self::Scene),
            "room" => Ok(Self::Room),
            "effect" => Ok(Self::Effect),
            other => Err(CoreError::Validation(format!(
                "Unknown asset type '{other}'. Must be one of: character, monster, scene, room, effect"
            ))),
        }
    }

    /// The enumerated set of sizes a request may ask for.
    pub fn legal_sizes(self) -> &'static [AssetSize] {
        match self {
            Self::Character => CHARACTER_SIZES,
            Self::Monster => MONSTER_SIZES,
            Self::Scene => SCENE_SIZES,
            Self::Room => ROOM_SIZES,
            Self::Effect => EFFECT_SIZES,
        }
    }

    /// Canonical size used when a request omits one.
    pub fn default_size(self) -> AssetSize {
        match self {
            Self::Character => AssetSize::new(64, 64),
            Self::Monster => AssetSize::new(96, 96),
            Self::Scene => AssetSize::new(640, 360),
            Self::Room => AssetSize::new(512, 512),
            Self::Effect => AssetSize::new(32, 32),
        }
    }
}

impl fmt::Display for AssetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Priority
// ---------------------------------------------------------------------------

/// Scheduling priority. Lower rank dispatches first; ties break by
/// arrival order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    #[default]
    Normal,
    Low,
}

impl Priority {
    /// Numeric rank used by the queue ordering (high=0, normal=1, low=2).
    pub fn rank(self) -> u8 {
        match self {
            Self::High => 0,
            Self::Normal => 1,
            Self::Low => 2,
        }
    }
}

// ---------------------------------------------------------------------------
// ProviderId
// ---------------------------------------------------------------------------

/// Identifier for a generation backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    /// Hosted pixel-art generation API (cheap, fast, needs an API key).
    PixelLab,
    /// Local Stable Diffusion WebUI instance.
    Diffusion,
    /// Offline deterministic sprite synthesizer. Always available.
    Procedural,
}

impl ProviderId {
    /// All providers, in hybrid-preference order for no particular type.
    pub const ALL: &'static [ProviderId] = &[Self::PixelLab, Self::Diffusion, Self::Procedural];

    /// Lowercase name as recorded in cache entries and results.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PixelLab => "pixellab",
            Self::Diffusion => "diffusion",
            Self::Procedural => "procedural",
        }
    }

    /// Parse from the lowercase name (config values, query params).
    pub fn from_name(name: &str) -> Result<Self, CoreError> {
        match name {
            "pixellab" => Ok(Self::PixelLab),
            "diffusion" => Ok(Self::Diffusion),
            "procedural" => Ok(Self::Procedural),
            other => Err(CoreError::Validation(format!(
                "Unknown provider '{other}'. Must be one of: pixellab, diffusion, procedural"
            ))),
        }
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// A caller's request for one generated asset, before validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub asset_type: AssetType,
    /// Free-text description fed to the generation backend.
    pub description: String,
    /// Requested size. Defaults to the type's canonical size.
    #[serde(default)]
    pub size: Option<AssetSize>,
    #[serde(default)]
    pub priority: Priority,
    /// When true the caller blocks until the asset is generated.
    #[serde(default)]
    pub wait_for_result: bool,
    /// Opaque routing key for progress events.
    #[serde(default)]
    pub session_id: Option<String>,
    /// Opaque caller metadata, echoed back on events.
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

impl GenerationRequest {
    /// Create a request with defaults for everything but type and text.
    pub fn new(asset_type: AssetType, description: impl Into<String>) -> Self {
        Self {
            asset_type,
            description: description.into(),
            size: None,
            priority: Priority::Normal,
            wait_for_result: false,
            session_id: None,
            metadata: None,
        }
    }

    /// Request a specific (legal) size.
    pub fn with_size(mut self, size: AssetSize) -> Self {
        self.size = Some(size);
        self
    }

    /// Set the scheduling priority.
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Block the caller until generation completes.
    pub fn wait(mut self) -> Self {
        self.wait_for_result = true;
        self
    }
}

/// A validated request with its effective size resolved.
///
/// Produced by [`crate::validation::resolve_request`]; this is what flows
/// through the queue and the providers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedRequest {
    pub asset_type: AssetType,
    pub description: String,
    pub size: AssetSize,
    pub priority: Priority,
    pub session_id: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// The output of one successful generation (fresh or served from cache).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationResult {
    /// Public URL of the stored asset, relative to the service root.
    pub url: String,
    /// Filesystem path of the stored asset.
    pub local_path: String,
    pub cache_key: String,
    pub width: u32,
    pub height: u32,
    pub provider: ProviderId,
    /// Wall-clock time spent generating (0 for cache hits).
    pub generation_time_ms: u64,
    /// True when served from the cache without touching a provider.
    pub cached: bool,
}

// ---------------------------------------------------------------------------
// Queue statistics
// ---------------------------------------------------------------------------

/// Aggregate queue counters surfaced through the API.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct QueueStats {
    /// Jobs queued but not yet started.
    pub pending: usize,
    /// Jobs currently generating.
    pub active: usize,
    /// Jobs completed since startup.
    pub completed: u64,
    /// Jobs failed since startup.
    pub failed: u64,
    /// Job records currently tracked (queued + active + retained finished).
    pub size: usize,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn asset_type_round_trips_through_name() {
        for &ty in AssetType::ALL {
            assert_eq!(AssetType::from_name(ty.as_str()).unwrap(), ty);
        }
    }

    #[test]
    fn unknown_asset_type_rejected() {
        assert!(AssetType::from_name("weapon").is_err());
        assert!(AssetType::from_name("").is_err());
        assert!(AssetType::from_name("CHARACTER").is_err());
    }

    #[test]
    fn default_size_is_legal_for_every_type() {
        for &ty in AssetType::ALL {
            assert!(
                ty.legal_sizes().contains(&ty.default_size()),
                "{ty}: default size must be in the legal set"
            );
        }
    }

    #[test]
    fn size_displays_as_wxh() {
        assert_eq!(AssetSize::new(64, 64).to_string(), "64x64");
        assert_eq!(AssetSize::new(320, 180).to_string(), "320x180");
    }

    #[test]
    fn priority_ranks_order_high_first() {
        assert!(Priority::High.rank() < Priority::Normal.rank());
        assert!(Priority::Normal.rank() < Priority::Low.rank());
    }

    #[test]
    fn priority_default_is_normal() {
        assert_eq!(Priority::default(), Priority::Normal);
    }

    #[test]
    fn provider_round_trips_through_name() {
        for &p in ProviderId::ALL {
            assert_eq!(ProviderId::from_name(p.as_str()).unwrap(), p);
        }
        assert!(ProviderId::from_name("dalle").is_err());
    }

    #[test]
    fn request_builder_sets_fields() {
        let req = GenerationRequest::new(AssetType::Character, "grizzled dwarf")
            .with_size(AssetSize::new(32, 32))
            .with_priority(Priority::High)
            .wait();
        assert_eq!(req.size, Some(AssetSize::new(32, 32)));
        assert_eq!(req.priority, Priority::High);
        assert!(req.wait_for_result);
    }
}
