//! Pure domain logic for the Spritemill asset-generation service.
//!
//! This crate has zero internal dependencies so it can be used by every
//! other crate in the workspace: the cache, the queue, the provider
//! registry, the pipeline orchestrator, and the HTTP API.
//!
//! - [`types`] — asset types, sizes, priorities, request/result records.
//! - [`cache_key`] — description normalization and cache-key derivation.
//! - [`search`] — lexical overlap scoring for cache search.
//! - [`selection`] — the provider selection policy as a pure function.
//! - [`validation`] — request validation rules.
//! - [`hashing`] — shared SHA-256 hex digest helper.

pub mod cache_key;
pub mod error;
pub mod hashing;
pub mod search;
pub mod selection;
pub mod types;
pub mod validation;

pub use error::CoreError;
