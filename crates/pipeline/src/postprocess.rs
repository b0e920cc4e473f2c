//! Raw provider output → canonical cached PNG.
//!
//! Backends return images in whatever size and format they produce;
//! this module normalizes them to the exact requested size using
//! nearest-neighbor resampling only. Smoothing filters are never used:
//! blending colors destroys the hard pixel edges the whole product is
//! built around.

use std::io::Cursor;

use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, RgbaImage};

use spritemill_core::types::{AssetSize, AssetType};

/// Palette ceiling for quantized sprite output.
pub const MAX_PALETTE_COLORS: usize = 64;

/// NeuQuant sampling factor (1 = best quality, 30 = fastest).
const QUANT_SAMPLE_FACTOR: i32 = 10;

/// Errors from decoding or re-encoding generated bytes.
#[derive(Debug, thiserror::Error)]
pub enum PostProcessError {
    #[error("Image processing failed: {0}")]
    Image(#[from] image::ImageError),
}

/// True for asset types stored as palette-quantized sprites.
///
/// Characters and monsters get the full retro treatment; backdrops and
/// effects keep their original color depth.
pub fn should_quantize(asset_type: AssetType) -> bool {
    matches!(asset_type, AssetType::Character | AssetType::Monster)
}

/// Normalize raw generated bytes to the target size and encode as PNG.
///
/// Resizing (when needed) uses nearest-neighbor exclusively. When
/// `quantize` is set the pixels are first mapped onto a learned palette
/// of at most [`MAX_PALETTE_COLORS`] colors.
pub fn normalize(
    bytes: &[u8],
    target: AssetSize,
    quantize: bool,
) -> Result<Vec<u8>, PostProcessError> {
    let decoded = image::load_from_memory(bytes)?;

    let resized = if decoded.width() != target.width || decoded.height() != target.height {
        decoded.resize_exact(target.width, target.height, FilterType::Nearest)
    } else {
        decoded
    };

    let mut rgba = resized.to_rgba8();
    if quantize {
        quantize_in_place(&mut rgba);
    }

    let mut buf = Vec::new();
    DynamicImage::ImageRgba8(rgba).write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)?;
    Ok(buf)
}

/// Map every pixel onto a NeuQuant palette learned from the image.
fn quantize_in_place(img: &mut RgbaImage) {
    let quantizer = color_quant::NeuQuant::new(QUANT_SAMPLE_FACTOR, MAX_PALETTE_COLORS, img.as_raw());
    let palette = quantizer.color_map_rgba();

    for pixel in img.chunks_exact_mut(4) {
        let idx = quantizer.index_of(pixel);
        pixel.copy_from_slice(&palette[idx * 4..idx * 4 + 4]);
    }
}
