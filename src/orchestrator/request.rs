use std::sync::Arc;

use crate::constants::{DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE};
use crate::telemetry::{GenerationTracer, NoopTracer};

/// One caller request. Immutable once built.
#[derive(Clone)]
pub struct GenerationRequest {
    prompt: String,
    temperature: f64,
    max_tokens: u32,
    request_id: String,
    stream: bool,
    prompt_version: Option<String>,
    tracer: Option<Arc<dyn GenerationTracer>>,
}

impl GenerationRequest {
    /// Starts a non-streaming request with default sampling parameters.
    pub fn new(prompt: impl Into<String>, request_id: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            request_id: request_id.into(),
            stream: false,
            prompt_version: None,
            tracer: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn streaming(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }

    pub fn with_prompt_version(mut self, prompt_version: impl Into<String>) -> Self {
        self.prompt_version = Some(prompt_version.into());
        self
    }

    pub fn with_tracer(mut self, tracer: Arc<dyn GenerationTracer>) -> Self {
        self.tracer = Some(tracer);
        self
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    pub fn max_tokens(&self) -> u32 {
        self.max_tokens
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn is_streaming(&self) -> bool {
        self.stream
    }

    pub fn prompt_version(&self) -> Option<&str> {
        self.prompt_version.as_deref()
    }

    /// The request's tracer, or a [`NoopTracer`] when none was attached.
    pub fn tracer(&self) -> Arc<dyn GenerationTracer> {
        self.tracer
            .clone()
            .unwrap_or_else(|| Arc::new(NoopTracer))
    }
}

impl std::fmt::Debug for GenerationRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationRequest")
            .field("prompt_len", &self.prompt.len())
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("request_id", &self.request_id)
            .field("stream", &self.stream)
            .field("prompt_version", &self.prompt_version)
            .field("traced", &self.tracer.is_some())
            .finish()
    }
}
