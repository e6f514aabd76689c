use serde::{Deserialize, Serialize};

use llmgate::{DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE};

use crate::gateway::error::GatewayError;

/// Body shared by `/chat`, `/chat/stream` and `/summarize`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub prompt: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_temperature() -> f64 {
    DEFAULT_TEMPERATURE
}

fn default_max_tokens() -> u32 {
    DEFAULT_MAX_TOKENS
}

impl ChatRequest {
    /// Parses and checks a raw JSON body.
    pub fn from_value(value: serde_json::Value) -> Result<Self, GatewayError> {
        let request: ChatRequest = serde_json::from_value(value)
            .map_err(|e| GatewayError::InvalidRequest(format!("Invalid request schema: {}", e)))?;

        if !request.temperature.is_finite() || request.temperature < 0.0 {
            return Err(GatewayError::InvalidRequest(format!(
                "temperature must be a non-negative number, got {}",
                request.temperature
            )));
        }
        if request.max_tokens == 0 {
            return Err(GatewayError::InvalidRequest(
                "max_tokens must be greater than zero".to_string(),
            ));
        }

        Ok(request)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
    pub model: String,
    pub latency: f64,
    pub cache_hit: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummarizeResponse {
    pub summary: String,
    pub model: String,
    pub cache_hit: bool,
    pub prompt_version: String,
}
