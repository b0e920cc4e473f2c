//! Cache-key derivation for generated assets.
//!
//! A cache key is a pure function of (asset type, normalized description,
//! size): two requests that differ only in case, punctuation, or spacing
//! collide to the same key and therefore the same cached asset. The key
//! format is versioned so a change to the derivation scheme invalidates
//! old entries instead of silently colliding with them.

use crate::hashing::sha256_hex;
use crate::types::{AssetSize, AssetType};

/// Key-scheme version prefix. Bump when the derivation changes.
const KEY_VERSION: &str = "v1";

/// Number of hex characters kept from the digest.
const KEY_LENGTH: usize = 16;

/// Normalize a free-text description for key derivation and search.
///
/// - Lowercases.
/// - Drops every character that is not alphanumeric or a space.
/// - Collapses runs of whitespace to a single space and trims the ends.
pub fn normalize_description(description: &str) -> String {
    let cleaned: String = description
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();

    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Derive the cache key for a request.
///
/// Hashes `v1:{type}:{normalized description}:{w}x{h}` with SHA-256 and
/// truncates to [`KEY_LENGTH`] hex characters.
pub fn generate_cache_key(asset_type: AssetType, description: &str, size: AssetSize) -> String {
    let normalized = normalize_description(description);
    let material = format!("{KEY_VERSION}:{asset_type}:{normalized}:{size}");
    let mut digest = sha256_hex(material.as_bytes());
    digest.truncate(KEY_LENGTH);
    digest
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIZE: AssetSize = AssetSize::new(64, 64);

    // -- normalize_description ----------------------------------------------

    #[test]
    fn normalize_lowercases_and_strips_punctuation() {
        assert_eq!(
            normalize_description("Dwarf!  Blacksmith,"),
            "dwarf blacksmith"
        );
    }

    #[test]
    fn normalize_collapses_whitespace() {
        assert_eq!(
            normalize_description("  a   goblin \t archer \n"),
            "a goblin archer"
        );
    }

    #[test]
    fn normalize_keeps_digits() {
        assert_eq!(normalize_description("knight mk2"), "knight mk2");
    }

    #[test]
    fn normalize_empty_input() {
        assert_eq!(normalize_description("!!! ???"), "");
        assert_eq!(normalize_description(""), "");
    }

    // -- generate_cache_key -------------------------------------------------

    #[test]
    fn key_is_deterministic() {
        let a = generate_cache_key(AssetType::Character, "dwarf blacksmith", SIZE);
        let b = generate_cache_key(AssetType::Character, "dwarf blacksmith", SIZE);
        assert_eq!(a, b);
    }

    #[test]
    fn key_ignores_case_punctuation_and_spacing() {
        let canonical = generate_cache_key(AssetType::Character, "dwarf blacksmith", SIZE);
        for variant in ["Dwarf!  Blacksmith", "DWARF BLACKSMITH.", " dwarf,blacksmith "] {
            assert_eq!(
                generate_cache_key(AssetType::Character, variant, SIZE),
                canonical,
                "variant {variant:?} must collide with the canonical key"
            );
        }
    }

    #[test]
    fn key_changes_with_asset_type() {
        let a = generate_cache_key(AssetType::Character, "dwarf blacksmith", SIZE);
        let b = generate_cache_key(AssetType::Monster, "dwarf blacksmith", SIZE);
        assert_ne!(a, b);
    }

    #[test]
    fn key_changes_with_description() {
        let a = generate_cache_key(AssetType::Character, "dwarf blacksmith", SIZE);
        let b = generate_cache_key(AssetType::Character, "elf archer", SIZE);
        assert_ne!(a, b);
    }

    #[test]
    fn key_changes_with_size() {
        let a = generate_cache_key(AssetType::Character, "dwarf blacksmith", SIZE);
        let b = generate_cache_key(
            AssetType::Character,
            "dwarf blacksmith",
            AssetSize::new(32, 32),
        );
        assert_ne!(a, b);
    }

    #[test]
    fn key_has_fixed_length() {
        let key = generate_cache_key(AssetType::Effect, "spark", AssetSize::new(16, 16));
        assert_eq!(key.len(), KEY_LENGTH);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
