//! The generation pipeline: post-processing and orchestration.
//!
//! [`AssetService`] is the single entry point tying the subsystems
//! together: cache lookup → (hit: return) or (miss: generate now or
//! enqueue) → post-process → cache write → respond.
//!
//! - [`postprocess`] — nearest-neighbor normalization + palette
//!   quantization.
//! - [`GenerationExecutor`] — the select → generate → post-process →
//!   cache-write unit of work, run synchronously or by the queue.
//! - [`GenerateResponse`] — the three-way response (ready / complete /
//!   queued).

pub mod error;
pub mod executor;
pub mod postprocess;
pub mod response;
pub mod service;

pub use error::GenerateError;
pub use executor::GenerationExecutor;
pub use response::GenerateResponse;
pub use service::{AssetService, ServiceConfig};
