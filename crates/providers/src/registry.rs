//! Registry of configured generation backends.
//!
//! The registry owns the provider instances, tracks how many
//! generations are in flight on each (the live queue-pressure signal
//! the selection policy reads), and applies the pure selection function
//! from `spritemill_core::selection`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use spritemill_core::selection::{
    select_provider, ProviderSnapshot, SelectionError, SelectionMode,
};
use spritemill_core::types::{AssetType, ProviderId};

use crate::provider::GenerationProvider;

/// The configured set of generation backends.
pub struct ProviderRegistry {
    providers: Vec<Arc<dyn GenerationProvider>>,
    inflight: HashMap<ProviderId, Arc<AtomicUsize>>,
}

impl ProviderRegistry {
    /// Build a registry from the configured backends.
    pub fn new(providers: Vec<Arc<dyn GenerationProvider>>) -> Self {
        let inflight = providers
            .iter()
            .map(|p| (p.id(), Arc::new(AtomicUsize::new(0))))
            .collect();
        Self {
            providers,
            inflight,
        }
    }

    /// Look up a provider by id.
    pub fn get(&self, id: ProviderId) -> Option<Arc<dyn GenerationProvider>> {
        self.providers.iter().find(|p| p.id() == id).cloned()
    }

    /// Live observations of every registered provider.
    pub fn snapshots(&self) -> Vec<ProviderSnapshot> {
        self.providers
            .iter()
            .map(|p| ProviderSnapshot {
                id: p.id(),
                available: p.is_available(),
                inflight: self
                    .inflight
                    .get(&p.id())
                    .map(|c| c.load(Ordering::Relaxed))
                    .unwrap_or(0),
            })
            .collect()
    }

    /// Select the provider for one request.
    ///
    /// Pure function of (mode, asset type, availability, in-flight load);
    /// see [`spritemill_core::selection::select_provider`].
    pub fn select(
        &self,
        mode: SelectionMode,
        asset_type: AssetType,
        saturation_threshold: usize,
    ) -> Result<Arc<dyn GenerationProvider>, SelectionError> {
        let snapshots = self.snapshots();
        let id = select_provider(mode, asset_type, &snapshots, saturation_threshold)?;
        // The id came from our own snapshots, so the lookup cannot miss.
        self.get(id).ok_or(SelectionError::ProviderUnavailable(id))
    }

    /// Mark a generation as in flight on `id` for the guard's lifetime.
    pub fn begin_generation(&self, id: ProviderId) -> InflightGuard {
        let counter = self
            .inflight
            .get(&id)
            .cloned()
            .unwrap_or_else(|| Arc::new(AtomicUsize::new(0)));
        counter.fetch_add(1, Ordering::Relaxed);
        InflightGuard { counter }
    }
}

/// RAII guard decrementing a provider's in-flight count on drop.
pub struct InflightGuard {
    counter: Arc<AtomicUsize>,
}

impl Drop for InflightGuard {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::Relaxed);
    }
}
