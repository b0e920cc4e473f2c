//! Generation backends and the provider registry.
//!
//! Every backend implements [`GenerationProvider`]: a uniform
//! `generate(request) -> raw bytes` contract plus availability and
//! time/cost estimates. The [`ProviderRegistry`] owns the configured
//! backends, tracks per-provider in-flight load, and applies the pure
//! selection policy from `spritemill_core::selection`.
//!
//! Backends:
//! - [`PixelLabProvider`] — hosted pixel-art generation API.
//! - [`DiffusionProvider`] — local Stable Diffusion WebUI instance.
//! - [`ProceduralProvider`] — offline deterministic sprite synthesis,
//!   the always-available fallback.

pub mod diffusion;
pub mod pixellab;
pub mod procedural;
pub mod provider;
pub mod registry;

pub use diffusion::DiffusionProvider;
pub use pixellab::PixelLabProvider;
pub use procedural::ProceduralProvider;
pub use provider::{GenerationProvider, ProviderError};
pub use registry::{InflightGuard, ProviderRegistry};
