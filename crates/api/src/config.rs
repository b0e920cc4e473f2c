use std::path::PathBuf;

use spritemill_core::selection::SelectionMode;
use spritemill_core::types::ProviderId;

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS`.
    pub cors_origins: Vec<String>,
    /// Root of the asset cache tree (default: `./data/assets`).
    pub cache_dir: PathBuf,
    /// Cache entry TTL in seconds (default: 7 days).
    pub cache_ttl_secs: u64,
    /// Concurrent generation limit (default: `2`).
    pub generation_concurrency: usize,
    /// Execution attempts per job (default: `3`).
    pub generation_max_retries: u32,
    /// Per-attempt timeout in seconds (default: `120`).
    pub generation_timeout_secs: u64,
    /// Provider selection: `hybrid` or a provider name (default: `hybrid`).
    pub provider_mode: SelectionMode,
    /// PixelLab API base URL.
    pub pixellab_api_url: String,
    /// PixelLab API key; absent means the provider is unavailable.
    pub pixellab_api_key: Option<String>,
    /// Stable Diffusion WebUI base URL; absent means unavailable.
    pub diffusion_api_url: Option<String>,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                   | Default                    |
    /// |---------------------------|----------------------------|
    /// | `HOST`                    | `0.0.0.0`                  |
    /// | `PORT`                    | `3000`                     |
    /// | `CORS_ORIGINS`            | `http://localhost:5173`    |
    /// | `ASSET_CACHE_DIR`         | `./data/assets`            |
    /// | `CACHE_TTL_SECS`          | `604800` (7 days)          |
    /// | `GENERATION_CONCURRENCY`  | `2`                        |
    /// | `GENERATION_MAX_RETRIES`  | `3`                        |
    /// | `GENERATION_TIMEOUT_SECS` | `120`                      |
    /// | `PROVIDER_MODE`           | `hybrid`                   |
    /// | `PIXELLAB_API_URL`        | `https://api.pixellab.ai/v1` |
    /// | `PIXELLAB_API_KEY`        | unset                      |
    /// | `DIFFUSION_API_URL`       | unset                      |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let cache_dir =
            PathBuf::from(std::env::var("ASSET_CACHE_DIR").unwrap_or_else(|_| "./data/assets".into()));

        let cache_ttl_secs: u64 = std::env::var("CACHE_TTL_SECS")
            .unwrap_or_else(|_| "604800".into())
            .parse()
            .expect("CACHE_TTL_SECS must be a valid u64");

        let generation_concurrency: usize = std::env::var("GENERATION_CONCURRENCY")
            .unwrap_or_else(|_| "2".into())
            .parse()
            .expect("GENERATION_CONCURRENCY must be a valid usize");

        let generation_max_retries: u32 = std::env::var("GENERATION_MAX_RETRIES")
            .unwrap_or_else(|_| "3".into())
            .parse()
            .expect("GENERATION_MAX_RETRIES must be a valid u32");

        let generation_timeout_secs: u64 = std::env::var("GENERATION_TIMEOUT_SECS")
            .unwrap_or_else(|_| "120".into())
            .parse()
            .expect("GENERATION_TIMEOUT_SECS must be a valid u64");

        let provider_mode = match std::env::var("PROVIDER_MODE")
            .unwrap_or_else(|_| "hybrid".into())
            .as_str()
        {
            "hybrid" => SelectionMode::Hybrid,
            name => SelectionMode::Fixed(
                ProviderId::from_name(name).expect("PROVIDER_MODE must be hybrid or a provider name"),
            ),
        };

        let pixellab_api_url = std::env::var("PIXELLAB_API_URL")
            .unwrap_or_else(|_| "https://api.pixellab.ai/v1".into());
        let pixellab_api_key = std::env::var("PIXELLAB_API_KEY").ok();
        let diffusion_api_url = std::env::var("DIFFUSION_API_URL").ok();

        Self {
            host,
            port,
            cors_origins,
            cache_dir,
            cache_ttl_secs,
            generation_concurrency,
            generation_max_retries,
            generation_timeout_secs,
            provider_mode,
            pixellab_api_url,
            pixellab_api_key,
            diffusion_api_url,
        }
    }
}
