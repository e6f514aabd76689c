//! Offline backend for local runs (`LLMGATE_MOCK_PROVIDER`) and tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use futures_util::stream::{self, StreamExt};

use super::{
    BackendCall, BackendError, BackendResult, FragmentStream, GenerationResult, LlmBackend,
    StreamFragment,
};
use crate::constants::live_metadata;

/// Deterministic [`LlmBackend`] with call counters.
///
/// By default it answers `"Mock response for: <prompt>"`, streamed word by word. Clones share
/// their counters.
#[derive(Debug, Clone, Default)]
pub struct MockBackend {
    fragments: Option<Vec<String>>,
    failure: Option<String>,
    stream_failure_after: Option<usize>,
    latency: f64,
    generate_calls: Arc<AtomicUsize>,
    stream_calls: Arc<AtomicUsize>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replies with exactly these fragments (their concatenation for atomic calls).
    pub fn with_fragments<I, S>(mut self, fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fragments = Some(fragments.into_iter().map(Into::into).collect());
        self
    }

    /// Fails every call with `cause`.
    pub fn failing(mut self, cause: impl Into<String>) -> Self {
        self.failure = Some(cause.into());
        self
    }

    /// Yields `count` text fragments, then an error instead of the rest of the stream.
    pub fn failing_stream_after(mut self, count: usize) -> Self {
        self.stream_failure_after = Some(count);
        self
    }

    /// Latency reported by atomic calls and in the stream trailer.
    pub fn with_latency(mut self, latency: f64) -> Self {
        self.latency = latency;
        self
    }

    pub fn generate_calls(&self) -> usize {
        self.generate_calls.load(Ordering::SeqCst)
    }

    pub fn stream_calls(&self) -> usize {
        self.stream_calls.load(Ordering::SeqCst)
    }

    pub fn total_calls(&self) -> usize {
        self.generate_calls() + self.stream_calls()
    }

    fn fragments_for(&self, prompt: &str) -> Vec<String> {
        match &self.fragments {
            Some(fragments) => fragments.clone(),
            None => format!("Mock response for: {prompt}")
                .split_inclusive(' ')
                .map(str::to_string)
                .collect(),
        }
    }

    fn check_failure(&self, call: &BackendCall<'_>) -> BackendResult<()> {
        match &self.failure {
            Some(cause) => Err(BackendError::new(call.request_id, call.model, cause)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl LlmBackend for MockBackend {
    async fn generate(&self, call: BackendCall<'_>) -> BackendResult<GenerationResult> {
        self.generate_calls.fetch_add(1, Ordering::SeqCst);
        self.check_failure(&call)?;

        Ok(GenerationResult {
            text: self.fragments_for(call.prompt).concat(),
            model: call.model.to_string(),
            latency: self.latency,
        })
    }

    async fn stream_generate(&self, call: BackendCall<'_>) -> BackendResult<FragmentStream> {
        self.stream_calls.fetch_add(1, Ordering::SeqCst);
        self.check_failure(&call)?;

        let mut items: Vec<BackendResult<StreamFragment>> = self
            .fragments_for(call.prompt)
            .into_iter()
            .map(|text| Ok(StreamFragment::Text(text)))
            .collect();

        match self.stream_failure_after {
            Some(count) => {
                items.truncate(count);
                items.push(Err(BackendError::new(
                    call.request_id,
                    call.model,
                    "stream interrupted",
                )));
            }
            None => items.push(Ok(StreamFragment::Metadata(live_metadata(
                call.model,
                self.latency,
            )))),
        }

        Ok(stream::iter(items).boxed())
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
