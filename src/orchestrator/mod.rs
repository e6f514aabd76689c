//! Cache-aware generation.
//!
//! [`ResponseOrchestrator::generate_with_cache`] consults the cache and drives one of four
//! paths: cached result, cached replay stream, live result written to cache, or live stream
//! captured and written to cache once fully drained.
//!
//! There is no single-flight deduplication: concurrent misses on the same key each call the
//! backend and each write the entry.

pub mod error;
pub mod request;

#[cfg(test)]
mod tests;

pub use error::{OrchestratorError, OrchestratorResult};
pub use request::GenerationRequest;

use std::sync::Arc;

use futures_util::StreamExt;
use tracing::{error, info, instrument, warn};

use crate::backend::{BackendCall, GenerationResult, LlmBackend};
use crate::cache::{CacheEntry, CacheError, CacheLookup, CacheStatus, CacheStore};
use crate::streaming::{GenerationStream, StreamAggregator};
use crate::telemetry::{ActiveSpan, SpanEnd, SpanStart};

/// How cache read/write failures affect a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheErrorPolicy {
    /// Abort the request with [`OrchestratorError::CacheUnavailable`].
    #[default]
    Propagate,
    /// Treat read failures as misses and log write failures.
    Degrade,
}

impl std::str::FromStr for CacheErrorPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "propagate" | "strict" => Ok(Self::Propagate),
            "degrade" | "miss" => Ok(Self::Degrade),
            _ => Err(format!("Unknown cache error policy: {}", s)),
        }
    }
}

/// Delivered response: atomic or streamed.
#[derive(Debug)]
pub enum GenerationOutcome {
    Complete(GenerationResult),
    Stream(GenerationStream),
}

impl GenerationOutcome {
    pub fn into_result(self) -> Option<GenerationResult> {
        match self {
            GenerationOutcome::Complete(result) => Some(result),
            GenerationOutcome::Stream(_) => None,
        }
    }

    pub fn into_stream(self) -> Option<GenerationStream> {
        match self {
            GenerationOutcome::Complete(_) => None,
            GenerationOutcome::Stream(stream) => Some(stream),
        }
    }
}

#[derive(Debug)]
pub struct GenerationResponse {
    pub outcome: GenerationOutcome,
    pub status: CacheStatus,
}

impl GenerationResponse {
    pub fn cache_hit(&self) -> bool {
        self.status.is_hit()
    }
}

/// Stateless per-request coordinator over a shared cache and backend.
#[derive(Clone)]
pub struct ResponseOrchestrator {
    cache: CacheStore,
    backend: Arc<dyn LlmBackend>,
    default_model: String,
    cache_error_policy: CacheErrorPolicy,
    aggregator: StreamAggregator,
}

impl ResponseOrchestrator {
    pub fn new(
        cache: CacheStore,
        backend: Arc<dyn LlmBackend>,
        default_model: impl Into<String>,
    ) -> Self {
        Self {
            cache,
            backend,
            default_model: default_model.into(),
            cache_error_policy: CacheErrorPolicy::default(),
            aggregator: StreamAggregator::default(),
        }
    }

    pub fn with_cache_error_policy(mut self, policy: CacheErrorPolicy) -> Self {
        self.cache_error_policy = policy;
        self
    }

    pub fn with_aggregator(mut self, aggregator: StreamAggregator) -> Self {
        self.aggregator = aggregator;
        self
    }

    /// The model every request is served with. Requests cannot override it.
    pub fn model(&self) -> &str {
        &self.default_model
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    pub fn cache_error_policy(&self) -> CacheErrorPolicy {
        self.cache_error_policy
    }

    #[instrument(
        skip(self, request),
        fields(request_id = %request.request_id(), stream = request.is_streaming())
    )]
    pub async fn generate_with_cache(
        &self,
        request: GenerationRequest,
    ) -> OrchestratorResult<GenerationResponse> {
        let model = self.default_model.clone();
        let span = ActiveSpan::start(
            request.tracer(),
            &SpanStart {
                name: "llm_generation",
                request_id: request.request_id(),
                model: &model,
                prompt: request.prompt(),
                temperature: request.temperature(),
                max_tokens: request.max_tokens(),
                prompt_version: request.prompt_version(),
                streaming: request.is_streaming(),
            },
        );

        let lookup = match self.lookup(&request, &model).await {
            Ok(lookup) => lookup,
            Err(e) => {
                span.finish(&SpanEnd::failure(CacheStatus::Miss, &e.to_string()));
                return Err(e);
            }
        };

        match lookup {
            CacheLookup::Hit(entry) => {
                info!(
                    request_id = request.request_id(),
                    model = %model,
                    temperature = request.temperature(),
                    prompt_version = request.prompt_version(),
                    "cache_hit"
                );
                span.finish(&SpanEnd::success(
                    CacheStatus::Hit,
                    &entry.text,
                    entry.latency,
                ));

                let outcome = if request.is_streaming() {
                    GenerationOutcome::Stream(self.aggregator.replay(entry, &model))
                } else {
                    GenerationOutcome::Complete(entry.into())
                };
                Ok(GenerationResponse {
                    outcome,
                    status: CacheStatus::Hit,
                })
            }
            CacheLookup::Miss => {
                info!(
                    request_id = request.request_id(),
                    model = %model,
                    temperature = request.temperature(),
                    prompt_version = request.prompt_version(),
                    "cache_miss"
                );

                let outcome = if request.is_streaming() {
                    self.stream_live(&request, model, span).await?
                } else {
                    self.generate_live(&request, &model, span).await?
                };
                Ok(GenerationResponse {
                    outcome,
                    status: CacheStatus::Miss,
                })
            }
        }
    }

    async fn lookup(
        &self,
        request: &GenerationRequest,
        model: &str,
    ) -> OrchestratorResult<CacheLookup> {
        match self
            .cache
            .get(request.prompt(), model, request.temperature())
            .await
        {
            Ok(lookup) => Ok(lookup),
            Err(e) => match self.cache_error_policy {
                CacheErrorPolicy::Propagate => {
                    error!(request_id = request.request_id(), error = %e, "cache_read_failed");
                    Err(e.into())
                }
                CacheErrorPolicy::Degrade => {
                    warn!(
                        request_id = request.request_id(),
                        error = %e,
                        "cache read failed, treating as miss"
                    );
                    Ok(CacheLookup::Miss)
                }
            },
        }
    }

    fn backend_call<'a>(request: &'a GenerationRequest, model: &'a str) -> BackendCall<'a> {
        BackendCall {
            prompt: request.prompt(),
            model,
            temperature: request.temperature(),
            max_tokens: request.max_tokens(),
            request_id: request.request_id(),
        }
    }

    async fn generate_live(
        &self,
        request: &GenerationRequest,
        model: &str,
        span: ActiveSpan,
    ) -> OrchestratorResult<GenerationOutcome> {
        let result = match self
            .backend
            .generate(Self::backend_call(request, model))
            .await
        {
            Ok(result) => result,
            Err(e) => {
                span.finish(&SpanEnd::failure(CacheStatus::Miss, &e.to_string()));
                return Err(e.into());
            }
        };

        let entry = CacheEntry::from(result.clone());
        let written = write_entry(
            &self.cache,
            self.cache_error_policy,
            request.prompt(),
            model,
            request.temperature(),
            &entry,
            request.request_id(),
        )
        .await;

        match &written {
            Ok(()) => span.finish(&SpanEnd::success(
                CacheStatus::Miss,
                &result.text,
                result.latency,
            )),
            Err(e) => span.finish(&SpanEnd::failure(CacheStatus::Miss, &e.to_string())),
        }
        written?;

        Ok(GenerationOutcome::Complete(result))
    }

    async fn stream_live(
        &self,
        request: &GenerationRequest,
        model: String,
        span: ActiveSpan,
    ) -> OrchestratorResult<GenerationOutcome> {
        let inner = match self
            .backend
            .stream_generate(Self::backend_call(request, &model))
            .await
        {
            Ok(inner) => inner,
            Err(e) => {
                span.finish(&SpanEnd::failure(CacheStatus::Miss, &e.to_string()));
                return Err(e.into());
            }
        };

        // Shared by the error hook and the commit; whichever runs first ends the span, and
        // dropping the stream before either ends it as cancelled.
        let span = Arc::new(span);
        let failed_span = span.clone();
        let inner = inner
            .inspect(move |item| {
                if let Err(e) = item {
                    failed_span.finish(&SpanEnd::failure(CacheStatus::Miss, &e.to_string()));
                }
            })
            .boxed();

        let cache = self.cache.clone();
        let policy = self.cache_error_policy;
        let prompt = request.prompt().to_string();
        let temperature = request.temperature();
        let prompt_version = request.prompt_version().map(str::to_string);
        let request_id = request.request_id().to_string();

        let stream = self.aggregator.capture(inner, move |text| async move {
            // Live latency was logged by the backend; the cached copy records zero.
            let entry = CacheEntry::new(text, model.as_str(), 0.0).with_prompt_version(prompt_version);
            let written = write_entry(
                &cache,
                policy,
                &prompt,
                &model,
                temperature,
                &entry,
                &request_id,
            )
            .await;

            match &written {
                Ok(()) => span.finish(&SpanEnd::success(CacheStatus::Miss, &entry.text, 0.0)),
                Err(e) => span.finish(&SpanEnd::failure(CacheStatus::Miss, &e.to_string())),
            }
            written
        });

        Ok(GenerationOutcome::Stream(stream))
    }
}

impl std::fmt::Debug for ResponseOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseOrchestrator")
            .field("cache", &self.cache)
            .field("backend", &self.backend.name())
            .field("default_model", &self.default_model)
            .field("cache_error_policy", &self.cache_error_policy)
            .field("aggregator", &self.aggregator)
            .finish()
    }
}

async fn write_entry(
    cache: &CacheStore,
    policy: CacheErrorPolicy,
    prompt: &str,
    model: &str,
    temperature: f64,
    entry: &CacheEntry,
    request_id: &str,
) -> OrchestratorResult<()> {
    match cache.set(prompt, model, temperature, entry).await {
        Ok(()) => Ok(()),
        Err(e) => handle_write_error(e, policy, request_id),
    }
}

fn handle_write_error(
    e: CacheError,
    policy: CacheErrorPolicy,
    request_id: &str,
) -> OrchestratorResult<()> {
    match policy {
        CacheErrorPolicy::Propagate => {
            error!(request_id = request_id, error = %e, "cache_write_failed");
            Err(e.into())
        }
        CacheErrorPolicy::Degrade => {
            warn!(request_id = request_id, error = %e, "cache write failed, response not cached");
            Ok(())
        }
    }
}
