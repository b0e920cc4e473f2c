//! Client for a local Stable Diffusion WebUI instance.
//!
//! Talks to the `/sdapi/v1/txt2img` endpoint of an automatic1111-style
//! server. Free to run but slower than the hosted backend, so the hybrid
//! policy prefers it for large backdrops where quality matters more
//! than latency.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::Deserialize;

use spritemill_core::types::{ProviderId, ResolvedRequest};

use crate::provider::{GenerationProvider, ProviderError};

/// Sampling steps per generation.
const STEPS: u32 = 24;

/// Style prefix applied to every prompt.
const STYLE_PREFIX: &str = "pixel art, 16-bit, limited palette";

/// Things the model should never draw.
const NEGATIVE_PROMPT: &str = "blurry, photorealistic, watermark, text";

/// HTTP client for one Stable Diffusion WebUI server.
pub struct DiffusionProvider {
    client: reqwest::Client,
    /// Base HTTP URL, e.g. `http://127.0.0.1:7860`. `None` when the
    /// server is not configured.
    base_url: Option<String>,
}

/// Response returned by `/sdapi/v1/txt2img`.
#[derive(Debug, Deserialize)]
struct Txt2ImgResponse {
    images: Vec<String>,
}

impl DiffusionProvider {
    /// Create a client. A missing or blank `base_url` marks the
    /// provider unavailable.
    pub fn new(base_url: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.filter(|u| !u.trim().is_empty()),
        }
    }

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
impl GenerationProvider for DiffusionProvider {
    fn id(&self) -> ProviderId {
        ProviderId::Diffusion
    }

    fn is_available(&self) -> bool {
        self.base_url.is_some()
    }

    async fn generate(&self, request: &ResolvedRequest) -> Result<Vec<u8>, ProviderError> {
        let Some(base_url) = &self.base_url else {
            return Err(ProviderError::NotConfigured(ProviderId::Diffusion));
        };

        let body = serde_json::json!({
            "prompt": format!("{STYLE_PREFIX}, {}", request.description),
            "negative_prompt": NEGATIVE_PROMPT,
            "width": request.size.width,
            "height": request.size.height,
            "steps": STEPS,
        });

        let response = self
            .client
            .post(format!("{base_url}/sdapi/v1/txt2img"))
            .json(&body)
            .send()
            .await?;

        let response = Self::ensure_success(response).await?;
        let payload = response.json::<Txt2ImgResponse>().await?;

        let first = payload
            .images
            .first()
            .ok_or_else(|| ProviderError::Decode("response contained no images".to_string()))?;

        let bytes = BASE64
            .decode(first.as_bytes())
            .map_err(|e| ProviderError::Decode(format!("invalid base64 image: {e}")))?;

        tracing::debug!(
            asset_type = %request.asset_type,
            size = %request.size,
            bytes = bytes.len(),
            "Diffusion generation complete",
        );

        Ok(bytes)
    }

    fn estimate_time_ms(&self, request: &ResolvedRequest) -> u64 {
        // Diffusion time scales with pixel count and step count.
        let pixels = u64::from(request.size.width) * u64::from(request.size.height);
        10_000 + pixels * u64::from(STEPS) / 4_096
    }

    fn estimate_cost(&self, _request: &ResolvedRequest) -> f64 {
        // Local GPU: no marginal cost per image.
        0.0
    }
}
