use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use spritemill_core::selection::SelectionError;
use spritemill_pipeline::GenerateError;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`GenerateError`] for pipeline errors and adds HTTP-specific
/// variants. Implements [`IntoResponse`] to produce consistent JSON
/// error responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A pipeline error from `spritemill_pipeline`.
    #[error(transparent)]
    Generate(#[from] GenerateError),

    /// The requested resource does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Generate(err) => match err {
                GenerateError::InvalidRequest(core) => (
                    StatusCode::BAD_REQUEST,
                    "VALIDATION_ERROR",
                    core.to_string(),
                ),
                GenerateError::Selection(SelectionError::ProviderUnavailable(id)) => (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "PROVIDER_UNAVAILABLE",
                    format!("Provider '{id}' is not available"),
                ),
                GenerateError::Selection(SelectionError::NoProvidersAvailable) => (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "NO_PROVIDERS_AVAILABLE",
                    "No generation providers are available".to_string(),
                ),
                GenerateError::Generation(msg) => {
                    tracing::error!(error = %msg, "Generation failed");
                    (
                        StatusCode::BAD_GATEWAY,
                        "GENERATION_FAILED",
                        msg.clone(),
                    )
                }
            },

            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}
