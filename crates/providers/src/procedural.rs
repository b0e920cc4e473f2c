//! Offline procedural sprite synthesis.
//!
//! The fallback of last resort: no network, no credentials, always
//! available. Generates a mirrored block sprite from a seed derived
//! from the request, so the same description always yields the same
//! placeholder-quality asset.

use std::io::Cursor;

use async_trait::async_trait;
use image::{ImageFormat, Rgba, RgbaImage};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use spritemill_core::cache_key::normalize_description;
use spritemill_core::hashing::sha256_hex;
use spritemill_core::types::{ProviderId, ResolvedRequest};

use crate::provider::{GenerationProvider, ProviderError};

/// Number of sprite cells across the width; height follows the aspect.
const GRID_WIDTH: u32 = 16;

/// Probability that a cell in the left half is filled.
const FILL_PROBABILITY: f64 = 0.45;

/// Deterministic sprite synthesizer.
#[derive(Default)]
pub struct ProceduralProvider;

impl ProceduralProvider {
    pub fn new() -> Self {
        Self
    }

    /// Derive a 64-bit seed from the normalized request identity.
    fn seed_for(request: &ResolvedRequest) -> u64 {
        let material = format!(
            "{}:{}:{}",
            request.asset_type,
            normalize_description(&request.description),
            request.size,
        );
        let digest = sha256_hex(material.as_bytes());
        // First 16 hex chars are always parseable as u64.
        u64::from_str_radix(&digest[..16], 16).unwrap_or(0)
    }

    /// Render a horizontally mirrored block sprite.
    fn render(request: &ResolvedRequest, seed: u64) -> RgbaImage {
        let (width, height) = (request.size.width, request.size.height);
        let mut rng = StdRng::seed_from_u64(seed);

        // A small random palette: one base hue in three shades.
        let base: [u8; 3] = [
            rng.random_range(60..=220),
            rng.random_range(60..=220),
            rng.random_range(60..=220),
        ];
        let palette: [Rgba<u8>; 3] = [
            Rgba([base[0], base[1], base[2], 255]),
            Rgba([base[0] / 2, base[1] / 2, base[2] / 2, 255]),
            Rgba([
                base[0].saturating_add(60),
                base[1].saturating_add(60),
                base[2].saturating_add(60),
                255,
            ]),
        ];
        let transparent = Rgba([0, 0, 0, 0]);

        let grid_w = GRID_WIDTH.min(width);
        let grid_h = (grid_w * height / width).max(1);
        let cell_w = (width / grid_w).max(1);
        let cell_h = (height / grid_h).max(1);

        // Decide the left half (plus middle column), then mirror.
        let half = grid_w.div_ceil(2);
        let mut cells = vec![transparent; (grid_w * grid_h) as usize];
        for gy in 0..grid_h {
            for gx in 0..half {
                let color = if rng.random_bool(FILL_PROBABILITY) {
                    palette[rng.random_range(0..palette.len())]
                } else {
                    transparent
                };
                cells[(gy * grid_w + gx) as usize] = color;
                cells[(gy * grid_w + (grid_w - 1 - gx)) as usize] = color;
            }
        }

        RgbaImage::from_fn(width, height, |x, y| {
            let gx = (x / cell_w).min(grid_w - 1);
            let gy = (y / cell_h).min(grid_h - 1);
            cells[(gy * grid_w + gx) as usize]
        })
    }
}

#[async_trait]
impl GenerationProvider for ProceduralProvider {
    fn id(&self) -> ProviderId {
        ProviderId::Procedural
    }

    fn is_available(&self) -> bool {
        true
    }

    async fn generate(&self, request: &ResolvedRequest) -> Result<Vec<u8>, ProviderError> {
        let seed = Self::seed_for(request);
        let sprite = Self::render(request, seed);

        let mut buf = Vec::new();
        image::DynamicImage::ImageRgba8(sprite)
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .map_err(|e| ProviderError::Decode(format!("PNG encoding failed: {e}")))?;

        tracing::debug!(
            asset_type = %request.asset_type,
            size = %request.size,
            seed,
            bytes = buf.len(),
            "Procedural sprite synthesized",
        );

        Ok(buf)
    }

    fn estimate_time_ms(&self, _request: &ResolvedRequest) -> u64 {
        // Purely local pixel pushing.
        5
    }

    fn estimate_cost(&self, _request: &ResolvedRequest) -> f64 {
        0.0
    }
}
