//! llmgate library crate (used by the server and integration tests).
//!
//! # Public API Surface
//!
//! ## Core
//! - [`ResponseOrchestrator`], [`GenerationRequest`], [`GenerationResponse`] - Cache-aware
//!   generation in atomic and streaming modes
//! - [`CacheStore`], [`CacheEntry`], [`CacheLookup`] - Response cache over a [`KeyValueStore`]
//! - [`StreamAggregator`], [`GenerationStream`] - Cached replay and live stream capture
//!
//! ## Collaborators
//! - [`LlmBackend`], [`GenaiBackend`], [`MockBackend`] - Text generation providers
//! - [`PromptResolver`], [`FilePromptLoader`] - Versioned prompt templates
//! - [`VariantRouter`] - Uniform A/B variant choice
//! - [`GenerationTracer`], [`LogTracer`] - Best-effort span hooks
//!
//! ## Utilities
//! - [`Config`], [`ConfigError`] - Environment configuration
//! - [`derive_cache_key`] and the other hashing helpers
//!
//! [`MockBackend`] is always compiled: the server can run against it offline.

pub mod backend;
pub mod cache;
pub mod config;
pub mod constants;
pub mod hashing;
pub mod orchestrator;
pub mod prompt;
pub mod routing;
pub mod streaming;
pub mod telemetry;

pub use backend::{
    BackendCall, BackendError, BackendResult, FragmentStream, GenaiBackend, GenerationResult,
    LlmBackend, MockBackend, StreamFragment,
};
pub use cache::{
    CacheEntry, CacheError, CacheLookup, CacheResult, CacheStatus, CacheStore, KeyValueStore,
    LLMGATE_CACHE_HEADER, LLMGATE_REQUEST_ID_HEADER, MemoryStore,
};
pub use config::{Config, ConfigError};
pub use constants::{
    DEFAULT_CACHE_TTL, DEFAULT_CACHE_TTL_SECS, DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE,
    METADATA_MARKER, REPLAY_CHUNK_SIZE, SUMMARIZE_TEMPERATURE,
};
pub use hashing::{CacheKey, canonical_key_input, canonical_temperature, derive_cache_key};
pub use orchestrator::{
    CacheErrorPolicy, GenerationOutcome, GenerationRequest, GenerationResponse,
    OrchestratorError, OrchestratorResult, ResponseOrchestrator,
};
pub use prompt::{FilePromptLoader, PromptDefinition, PromptError, PromptResolver, render_template};
pub use routing::{RoutingError, VariantRouter};
pub use streaming::{GenerationStream, StreamAggregator};
pub use telemetry::{
    GenerationTracer, LogTracer, NoopTracer, SpanEnd, SpanId, SpanStart, TraceError,
};
