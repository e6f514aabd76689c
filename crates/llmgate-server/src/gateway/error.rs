use axum::{
    Json,
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use thiserror::Error;

use llmgate::{OrchestratorError, PromptError};

/// Machine-readable error code header set on every error response.
pub const LLMGATE_ERROR_HEADER: &str = "X-Llmgate-Error";

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("cache unavailable: {0}")]
    CacheUnavailable(String),

    #[error("provider error: {0}")]
    ProviderError(String),

    #[error("prompt resolution failed: {0}")]
    PromptResolution(String),

    #[error("internal error: {0}")]
    InternalError(String),
}

impl GatewayError {
    pub fn code(&self) -> &'static str {
        match self {
            GatewayError::InvalidRequest(_) => "invalid_request",
            GatewayError::CacheUnavailable(_) => "cache_unavailable",
            GatewayError::ProviderError(_) => "provider_error",
            GatewayError::PromptResolution(_) => "prompt_error",
            GatewayError::InternalError(_) => "internal_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            GatewayError::CacheUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            GatewayError::ProviderError(_) => StatusCode::BAD_GATEWAY,
            GatewayError::PromptResolution(_) | GatewayError::InternalError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<OrchestratorError> for GatewayError {
    fn from(err: OrchestratorError) -> Self {
        match err {
            OrchestratorError::CacheUnavailable(e) => GatewayError::CacheUnavailable(e.to_string()),
            // Provider details stay in the logs.
            OrchestratorError::Backend(_) => {
                GatewayError::ProviderError("Upstream service request failed".to_string())
            }
            OrchestratorError::PromptResolution(e) => GatewayError::PromptResolution(e.to_string()),
        }
    }
}

impl From<PromptError> for GatewayError {
    fn from(err: PromptError) -> Self {
        GatewayError::PromptResolution(err.to_string())
    }
}

#[derive(serde::Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();

        let mut headers = HeaderMap::new();
        headers.insert(LLMGATE_ERROR_HEADER, HeaderValue::from_static(self.code()));

        let body = Json(ErrorResponse {
            error: self.to_string(),
            code: status.as_u16(),
        });

        (status, headers, body).into_response()
    }
}
