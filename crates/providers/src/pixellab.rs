//! Client for the hosted PixelLab pixel-art generation API.
//!
//! PixelLab is the designated cheap/fast backend for sprite-like asset
//! types. The API takes a JSON body with the description and target
//! size and answers with a base64-encoded PNG.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::Deserialize;

use spritemill_core::types::{AssetType, ProviderId, ResolvedRequest};

use crate::provider::{GenerationProvider, ProviderError};

/// Flat per-image price in USD.
const COST_PER_IMAGE_USD: f64 = 0.01;

/// Baseline latency for a small sprite, in milliseconds.
const BASE_TIME_MS: u64 = 6_000;

/// HTTP client for the PixelLab generation endpoint.
pub struct PixelLabProvider {
    client: reqwest::Client,
    api_url: String,
    api_key: Option<String>,
}

/// Response returned by the `/generate-image-pixflux` endpoint.
#[derive(Debug, Deserialize)]
struct GenerateResponse {
    image: ImagePayload,
}

#[derive(Debug, Deserialize)]
struct ImagePayload {
    base64: String,
}

impl PixelLabProvider {
    /// Create a client.
    ///
    /// * `api_url` - base HTTP URL, e.g. `https://api.pixellab.ai/v1`.
    /// * `api_key` - bearer token; `None` marks the provider unavailable.
    pub fn new(api_url: String, api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        }
    }

    /// Ensure the response has a success status code, or capture the
    /// status and body text for debugging.
    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, ProviderError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(ProviderError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl GenerationProvider for PixelLabProvider {
    fn id(&self) -> ProviderId {
        ProviderId::PixelLab
    }

    fn is_available(&self) -> bool {
        self.api_key.is_some()
    }

    async fn generate(&self, request: &ResolvedRequest) -> Result<Vec<u8>, ProviderError> {
        let Some(api_key) = &self.api_key else {
            return Err(ProviderError::NotConfigured(ProviderId::PixelLab));
        };

        let body = serde_json::json!({
            "description": request.description,
            "image_size": {
                "width": request.size.width,
                "height": request.size.height,
            },
            // Sprites get a transparent background; backdrops keep theirs.
            "no_background": matches!(
                request.asset_type,
                AssetType::Character | AssetType::Monster | AssetType::Effect
            ),
        });

        let response = self
            .client
            .post(format!("{}/generate-image-pixflux", self.api_url))
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?;

        let response = Self::ensure_success(response).await?;
        let payload = response.json::<GenerateResponse>().await?;

        let bytes = BASE64
            .decode(payload.image.base64.as_bytes())
            .map_err(|e| ProviderError::Decode(format!("invalid base64 image: {e}")))?;

        tracing::debug!(
            asset_type = %request.asset_type,
            size = %request.size,
            bytes = bytes.len(),
            "PixelLab generation complete",
        );

        Ok(bytes)
    }

    fn estimate_time_ms(&self, request: &ResolvedRequest) -> u64 {
        // Latency grows roughly with pixel count; 64x64 is the baseline.
        let pixels = u64::from(request.size.width) * u64::from(request.size.height);
        BASE_TIME_MS + pixels / 512
    }

    fn estimate_cost(&self, _request: &ResolvedRequest) -> f64 {
        COST_PER_IMAGE_USD
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spritemill_core::types::{AssetSize, Priority};

    fn request(size: AssetSize) -> ResolvedRequest {
        ResolvedRequest {
            asset_type: AssetType::Character,
            description: "dwarf blacksmith".into(),
            size,
            priority: Priority::Normal,
            session_id: None,
            metadata: None,
        }
    }

    #[test]
    fn availability_requires_api_key() {
        let with_key = PixelLabProvider::new("https://api".into(), Some("sk-123".into()));
        assert!(with_key.is_available());

        let without = PixelLabProvider::new("https://api".into(), None);
        assert!(!without.is_available());

        let blank = PixelLabProvider::new("https://api".into(), Some("   ".into()));
        assert!(!blank.is_available());
    }

    #[test]
    fn time_estimate_grows_with_size() {
        let provider = PixelLabProvider::new("https://api".into(), Some("sk".into()));
        let small = provider.estimate_time_ms(&request(AssetSize::new(32, 32)));
        let large = provider.estimate_time_ms(&request(AssetSize::new(128, 128)));
        assert!(large > small);
    }

    #[tokio::test]
    async fn generate_without_key_is_not_configured() {
        let provider = PixelLabProvider::new("https://api".into(), None);
        let err = provider
            .generate(&request(AssetSize::new(64, 64)))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::NotConfigured(ProviderId::PixelLab)));
    }
}
