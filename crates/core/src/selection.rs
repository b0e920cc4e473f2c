//! Provider selection policy.
//!
//! Selection is a pure function over (configuration, asset type, live
//! availability, live load) so it can be tested without network access.
//! The registry takes the resulting [`ProviderId`] and dispatches to the
//! actual backend.

use crate::types::{AssetType, ProviderId};

/// How many in-flight generations a provider may carry before the hybrid
/// policy prefers the next-best backend for a request.
pub const DEFAULT_SATURATION_THRESHOLD: usize = 4;

/// Configured selection behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionMode {
    /// Always use one specific provider; fail hard if it is unavailable.
    Fixed(ProviderId),
    /// Prefer the designated cheap/fast provider, falling back per asset
    /// type based on availability and load.
    Hybrid,
}

/// Live observation of one provider, assembled by the registry.
#[derive(Debug, Clone, Copy)]
pub struct ProviderSnapshot {
    pub id: ProviderId,
    /// Credential/config sanity check — not a network round-trip guarantee.
    pub available: bool,
    /// Generations currently in flight on this provider.
    pub inflight: usize,
}

/// Why no provider could be selected.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SelectionError {
    /// The configured fixed provider is not available.
    #[error("Provider '{0}' is not available")]
    ProviderUnavailable(ProviderId),

    /// Hybrid mode found no available provider at all.
    #[error("No generation providers are available")]
    NoProvidersAvailable,
}

/// Hybrid fallback order per asset type.
///
/// PixelLab leads for sprite-like types (it is the designated cheap/fast
/// backend); large backdrops favor the local diffusion instance;
/// effects are cheap enough to synthesize procedurally first.
pub fn fallback_order(asset_type: AssetType) -> &'static [ProviderId] {
    match asset_type {
        AssetType::Character | AssetType::Monster => &[
            ProviderId::PixelLab,
            ProviderId::Diffusion,
            ProviderId::Procedural,
        ],
        AssetType::Scene | AssetType::Room => &[
            ProviderId::Diffusion,
            ProviderId::PixelLab,
            ProviderId::Procedural,
        ],
        AssetType::Effect => &[
            ProviderId::Procedural,
            ProviderId::PixelLab,
            ProviderId::Diffusion,
        ],
    }
}

/// Select the provider for one request.
///
/// - `Fixed(p)`: returns `p` if available, else
///   [`SelectionError::ProviderUnavailable`].
/// - `Hybrid`: walks [`fallback_order`] for the asset type and returns the
///   first available provider whose in-flight count is at or below
///   `saturation_threshold`. If every available provider is saturated the
///   least-loaded available one is returned — saturation shifts load, it
///   never refuses work. Returns [`SelectionError::NoProvidersAvailable`]
///   when nothing is available.
pub fn select_provider(
    mode: SelectionMode,
    asset_type: AssetType,
    snapshots: &[ProviderSnapshot],
    saturation_threshold: usize,
) -> Result<ProviderId, SelectionError> {
    let snapshot_for = |id: ProviderId| snapshots.iter().find(|s| s.id == id);

    match mode {
        SelectionMode::Fixed(id) => match snapshot_for(id) {
            Some(s) if s.available => Ok(id),
            _ => Err(SelectionError::ProviderUnavailable(id)),
        },
        SelectionMode::Hybrid => {
            let order = fallback_order(asset_type);

            let available: Vec<&ProviderSnapshot> = order
                .iter()
                .filter_map(|&id| snapshot_for(id))
                .filter(|s| s.available)
                .collect();

            if available.is_empty() {
                return Err(SelectionError::NoProvidersAvailable);
            }

            if let Some(s) = available
                .iter()
                .find(|s| s.inflight <= saturation_threshold)
            {
                return Ok(s.id);
            }

            // Everyone is saturated: spread to the least-loaded backend.
            let least = available
                .iter()
                .min_by_key(|s| s.inflight)
                .map(|s| s.id)
                .ok_or(SelectionError::NoProvidersAvailable)?;
            Ok(least)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snap(id: ProviderId, available: bool, inflight: usize) -> ProviderSnapshot {
        ProviderSnapshot {
            id,
            available,
            inflight,
        }
    }

    fn all_available() -> Vec<ProviderSnapshot> {
        vec![
            snap(ProviderId::PixelLab, true, 0),
            snap(ProviderId::Diffusion, true, 0),
            snap(ProviderId::Procedural, true, 0),
        ]
    }

    // -- fixed mode ----------------------------------------------------------

    #[test]
    fn fixed_mode_uses_configured_provider() {
        let selected = select_provider(
            SelectionMode::Fixed(ProviderId::Diffusion),
            AssetType::Character,
            &all_available(),
            DEFAULT_SATURATION_THRESHOLD,
        )
        .unwrap();
        assert_eq!(selected, ProviderId::Diffusion);
    }

    #[test]
    fn fixed_mode_fails_hard_when_unavailable() {
        let snapshots = vec![snap(ProviderId::PixelLab, false, 0)];
        let err = select_provider(
            SelectionMode::Fixed(ProviderId::PixelLab),
            AssetType::Character,
            &snapshots,
            DEFAULT_SATURATION_THRESHOLD,
        )
        .unwrap_err();
        assert_eq!(err, SelectionError::ProviderUnavailable(ProviderId::PixelLab));
    }

    #[test]
    fn fixed_mode_fails_when_provider_missing_from_snapshots() {
        let err = select_provider(
            SelectionMode::Fixed(ProviderId::Diffusion),
            AssetType::Character,
            &[snap(ProviderId::Procedural, true, 0)],
            DEFAULT_SATURATION_THRESHOLD,
        )
        .unwrap_err();
        assert_eq!(err, SelectionError::ProviderUnavailable(ProviderId::Diffusion));
    }

    // -- hybrid mode ---------------------------------------------------------

    #[test]
    fn hybrid_prefers_pixellab_for_characters() {
        let selected = select_provider(
            SelectionMode::Hybrid,
            AssetType::Character,
            &all_available(),
            DEFAULT_SATURATION_THRESHOLD,
        )
        .unwrap();
        assert_eq!(selected, ProviderId::PixelLab);
    }

    #[test]
    fn hybrid_prefers_diffusion_for_scenes() {
        let selected = select_provider(
            SelectionMode::Hybrid,
            AssetType::Scene,
            &all_available(),
            DEFAULT_SATURATION_THRESHOLD,
        )
        .unwrap();
        assert_eq!(selected, ProviderId::Diffusion);
    }

    #[test]
    fn hybrid_prefers_procedural_for_effects() {
        let selected = select_provider(
            SelectionMode::Hybrid,
            AssetType::Effect,
            &all_available(),
            DEFAULT_SATURATION_THRESHOLD,
        )
        .unwrap();
        assert_eq!(selected, ProviderId::Procedural);
    }

    #[test]
    fn hybrid_falls_back_when_preferred_unavailable() {
        let snapshots = vec![
            snap(ProviderId::PixelLab, false, 0),
            snap(ProviderId::Diffusion, true, 0),
            snap(ProviderId::Procedural, true, 0),
        ];
        let selected = select_provider(
            SelectionMode::Hybrid,
            AssetType::Character,
            &snapshots,
            DEFAULT_SATURATION_THRESHOLD,
        )
        .unwrap();
        assert_eq!(selected, ProviderId::Diffusion);
    }

    #[test]
    fn hybrid_skips_saturated_provider() {
        let snapshots = vec![
            snap(ProviderId::PixelLab, true, DEFAULT_SATURATION_THRESHOLD + 1),
            snap(ProviderId::Diffusion, true, 0),
            snap(ProviderId::Procedural, true, 0),
        ];
        let selected = select_provider(
            SelectionMode::Hybrid,
            AssetType::Character,
            &snapshots,
            DEFAULT_SATURATION_THRESHOLD,
        )
        .unwrap();
        assert_eq!(selected, ProviderId::Diffusion);
    }

    #[test]
    fn hybrid_uses_least_loaded_when_all_saturated() {
        let snapshots = vec![
            snap(ProviderId::PixelLab, true, 9),
            snap(ProviderId::Diffusion, true, 6),
            snap(ProviderId::Procedural, true, 8),
        ];
        let selected = select_provider(
            SelectionMode::Hybrid,
            AssetType::Character,
            &snapshots,
            DEFAULT_SATURATION_THRESHOLD,
        )
        .unwrap();
        assert_eq!(selected, ProviderId::Diffusion);
    }

    #[test]
    fn hybrid_fails_when_nothing_available() {
        let snapshots = vec![
            snap(ProviderId::PixelLab, false, 0),
            snap(ProviderId::Diffusion, false, 0),
        ];
        let err = select_provider(
            SelectionMode::Hybrid,
            AssetType::Character,
            &snapshots,
            DEFAULT_SATURATION_THRESHOLD,
        )
        .unwrap_err();
        assert_eq!(err, SelectionError::NoProvidersAvailable);
    }

    #[test]
    fn fallback_order_covers_every_provider() {
        for &ty in AssetType::ALL {
            let order = fallback_order(ty);
            assert_eq!(order.len(), ProviderId::ALL.len());
            for &p in ProviderId::ALL {
                assert!(order.contains(&p), "{ty}: missing {p}");
            }
        }
    }
}
