use std::path::PathBuf;
use std::sync::Arc;

use spritemill_pipeline::AssetService;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via
/// `State<AppState>`.
///
/// Cheaply cloneable: everything lives behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// The orchestrator every handler delegates to.
    pub service: Arc<AssetService>,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
}

impl AppState {
    /// Directory served as static files under `/assets`.
    pub fn service_assets_dir(&self) -> PathBuf {
        self.config.cache_dir.clone()
    }
}
