//! Best-effort generation tracing hooks.
//!
//! A request may carry a [`GenerationTracer`]; without one the orchestrator uses
//! [`NoopTracer`]. Hook failures are logged at debug level and otherwise ignored.

pub mod error;

pub use error::TraceError;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tracing::{debug, info};

use crate::cache::CacheStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SpanId(pub u64);

/// Attributes recorded when a generation span opens.
#[derive(Debug, Clone, Copy)]
pub struct SpanStart<'a> {
    pub name: &'a str,
    pub request_id: &'a str,
    pub model: &'a str,
    pub prompt: &'a str,
    pub temperature: f64,
    pub max_tokens: u32,
    pub prompt_version: Option<&'a str>,
    pub streaming: bool,
}

/// Attributes recorded when a generation span closes.
#[derive(Debug, Clone, Copy)]
pub struct SpanEnd<'a> {
    pub cache_status: CacheStatus,
    pub output: Option<&'a str>,
    pub latency: Option<f64>,
    pub error: Option<&'a str>,
}

impl<'a> SpanEnd<'a> {
    pub fn success(cache_status: CacheStatus, output: &'a str, latency: f64) -> Self {
        Self {
            cache_status,
            output: Some(output),
            latency: Some(latency),
            error: None,
        }
    }

    pub fn failure(cache_status: CacheStatus, error: &'a str) -> Self {
        Self {
            cache_status,
            output: None,
            latency: None,
            error: Some(error),
        }
    }
}

pub trait GenerationTracer: Send + Sync {
    fn start_span(&self, span: &SpanStart<'_>) -> Result<SpanId, TraceError>;

    fn end_span(&self, id: SpanId, end: &SpanEnd<'_>) -> Result<(), TraceError>;
}

/// Tracer that records nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTracer;

impl GenerationTracer for NoopTracer {
    fn start_span(&self, _span: &SpanStart<'_>) -> Result<SpanId, TraceError> {
        Ok(SpanId(0))
    }

    fn end_span(&self, _id: SpanId, _end: &SpanEnd<'_>) -> Result<(), TraceError> {
        Ok(())
    }
}

/// Tracer that emits each span boundary as a `tracing` event.
#[derive(Debug, Default)]
pub struct LogTracer {
    next_id: AtomicU64,
}

impl LogTracer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl GenerationTracer for LogTracer {
    fn start_span(&self, span: &SpanStart<'_>) -> Result<SpanId, TraceError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        info!(
            span_id = id,
            name = span.name,
            request_id = span.request_id,
            model = span.model,
            prompt_len = span.prompt.len(),
            temperature = span.temperature,
            max_tokens = span.max_tokens,
            prompt_version = span.prompt_version,
            streaming = span.streaming,
            "generation_span_start"
        );
        Ok(SpanId(id))
    }

    fn end_span(&self, id: SpanId, end: &SpanEnd<'_>) -> Result<(), TraceError> {
        if id.0 == 0 || id.0 > self.next_id.load(Ordering::Relaxed) {
            return Err(TraceError::UnknownSpan(id.0));
        }
        info!(
            span_id = id.0,
            cache_status = %end.cache_status,
            output_len = end.output.map(str::len),
            latency = end.latency,
            error = end.error,
            "generation_span_end"
        );
        Ok(())
    }
}

/// Reported when a span is dropped before anything closed it.
pub(crate) const CANCELLED_REASON: &str = "generation cancelled";

/// An open span on some tracer; closing it is best-effort.
///
/// The span is ended at most once. One still open on drop is ended as a
/// [`CANCELLED_REASON`] failure.
pub(crate) struct ActiveSpan {
    tracer: Arc<dyn GenerationTracer>,
    id: Mutex<Option<SpanId>>,
}

impl ActiveSpan {
    pub(crate) fn start(tracer: Arc<dyn GenerationTracer>, span: &SpanStart<'_>) -> Self {
        let id = match tracer.start_span(span) {
            Ok(id) => Some(id),
            Err(e) => {
                debug!(error = %e, "trace span start failed");
                None
            }
        };
        Self {
            tracer,
            id: Mutex::new(id),
        }
    }

    pub(crate) fn finish(&self, end: &SpanEnd<'_>) {
        let Some(id) = self.take_id() else {
            return;
        };
        if let Err(e) = self.tracer.end_span(id, end) {
            debug!(error = %e, "trace span end failed");
        }
    }

    fn take_id(&self) -> Option<SpanId> {
        match self.id.lock() {
            Ok(mut id) => id.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        }
    }
}

impl Drop for ActiveSpan {
    fn drop(&mut self) {
        self.finish(&SpanEnd::failure(CacheStatus::Miss, CANCELLED_REASON));
    }
}
