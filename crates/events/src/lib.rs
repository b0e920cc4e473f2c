//! Spritemill event bus.
//!
//! Provides the in-process publish/subscribe hub used to surface job and
//! cache lifecycle events to external subscribers (e.g. a socket layer
//! forwarding generation progress to connected clients).
//!
//! - [`EventBus`] — broadcast hub backed by `tokio::sync::broadcast`.
//! - [`AssetEvent`] — the typed lifecycle event.

pub mod bus;

pub use bus::{AssetEvent, EventBus};
