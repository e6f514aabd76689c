//! LLM backend seam.
//!
//! The orchestrator only sees [`LlmBackend`]; [`GenaiBackend`] talks to a real provider and
//! [`MockBackend`] answers offline.

pub mod error;
pub mod provider;
pub mod mock;

pub use error::{BackendError, BackendResult};
pub use provider::GenaiBackend;
pub use mock::MockBackend;

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use serde::{Deserialize, Serialize};

/// Atomic response of a non-streaming call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationResult {
    pub text: String,
    pub model: String,
    /// Wall-clock seconds of the provider call.
    pub latency: f64,
}

/// One piece of a streamed response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamFragment {
    /// Generated text.
    Text(String),
    /// Synthesized trailer (`\n\n[MODEL=...]`), always last.
    Metadata(String),
}

impl StreamFragment {
    pub fn as_str(&self) -> &str {
        match self {
            StreamFragment::Text(s) | StreamFragment::Metadata(s) => s,
        }
    }

    pub fn into_text(self) -> String {
        match self {
            StreamFragment::Text(s) | StreamFragment::Metadata(s) => s,
        }
    }

    pub fn is_metadata(&self) -> bool {
        matches!(self, StreamFragment::Metadata(_))
    }
}

/// Finite, non-restartable sequence of fragments from a backend.
pub type FragmentStream = BoxStream<'static, BackendResult<StreamFragment>>;

/// Parameters of one provider call.
#[derive(Debug, Clone, Copy)]
pub struct BackendCall<'a> {
    pub prompt: &'a str,
    pub model: &'a str,
    pub temperature: f64,
    pub max_tokens: u32,
    /// Correlation only.
    pub request_id: &'a str,
}

#[async_trait]
pub trait LlmBackend: Send + Sync {
    /// Issues an atomic generation call.
    async fn generate(&self, call: BackendCall<'_>) -> BackendResult<GenerationResult>;

    /// Opens a streamed generation call.
    ///
    /// Latency is measured from the call start to stream-open, not to stream completion, and
    /// is reported in the trailing [`StreamFragment::Metadata`].
    async fn stream_generate(&self, call: BackendCall<'_>) -> BackendResult<FragmentStream>;

    fn name(&self) -> &'static str;
}
