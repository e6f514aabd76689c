use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;

use super::*;
use crate::backend::{MockBackend, StreamFragment};
use crate::cache::{CacheResult, KeyValueStore, MemoryStore};
use crate::constants::{cached_metadata, live_metadata};
use crate::telemetry::{GenerationTracer, SpanId, TraceError};

const MODEL: &str = "gemini-test";

/// Store whose reads and/or writes fail as if the server were unreachable.
struct FlakyStore {
    inner: MemoryStore,
    fail_reads: bool,
    fail_writes: bool,
}

impl FlakyStore {
    fn unavailable() -> Self {
        Self {
            inner: MemoryStore::new(),
            fail_reads: true,
            fail_writes: true,
        }
    }

    fn read_only() -> Self {
        Self {
            inner: MemoryStore::new(),
            fail_reads: false,
            fail_writes: true,
        }
    }

    fn refused() -> CacheError {
        CacheError::Unavailable {
            store: "flaky",
            reason: "connection refused".into(),
        }
    }
}

#[async_trait]
impl KeyValueStore for FlakyStore {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        if self.fail_reads {
            return Err(Self::refused());
        }
        self.inner.get(key).await
    }

    async fn set_with_expiry(&self, key: &str, value: String, ttl: Duration) -> CacheResult<()> {
        if self.fail_writes {
            return Err(Self::refused());
        }
        self.inner.set_with_expiry(key, value, ttl).await
    }

    fn name(&self) -> &'static str {
        "flaky"
    }
}

fn orchestrator_with(backend: MockBackend) -> (ResponseOrchestrator, CacheStore) {
    let cache = CacheStore::new(Arc::new(MemoryStore::new()));
    let orchestrator = ResponseOrchestrator::new(cache.clone(), Arc::new(backend), MODEL);
    (orchestrator, cache)
}

fn request(prompt: &str) -> GenerationRequest {
    GenerationRequest::new(prompt, "req-test")
}

async fn drain(stream: GenerationStream) -> Vec<Result<StreamFragment, OrchestratorError>> {
    stream.collect().await
}

fn texts(fragments: &[Result<StreamFragment, OrchestratorError>]) -> Vec<String> {
    fragments
        .iter()
        .map(|f| f.as_ref().expect("fragment").as_str().to_string())
        .collect()
}

#[tokio::test]
async fn test_miss_non_streaming_calls_backend_and_caches() {
    let backend = MockBackend::new().with_fragments(["Paris", "."]).with_latency(0.8);
    let (orchestrator, cache) = orchestrator_with(backend.clone());

    let response = orchestrator
        .generate_with_cache(request("capital of France?"))
        .await
        .expect("generate");

    assert!(!response.cache_hit());
    let result = response.outcome.into_result().expect("complete outcome");
    assert_eq!(result.text, "Paris.");
    assert_eq!(result.model, MODEL);
    assert_eq!(result.latency, 0.8);
    assert_eq!(backend.generate_calls(), 1);

    let cached = cache
        .get("capital of France?", MODEL, 0.7)
        .await
        .unwrap()
        .into_entry()
        .expect("entry written");
    assert_eq!(cached, CacheEntry::new("Paris.", MODEL, 0.8));
}

#[tokio::test]
async fn test_hit_non_streaming_skips_backend() {
    let backend = MockBackend::new();
    let (orchestrator, cache) = orchestrator_with(backend.clone());
    let entry = CacheEntry::new("cached answer", MODEL, 1.25);
    cache.set("q", MODEL, 0.7, &entry).await.unwrap();

    let response = orchestrator.generate_with_cache(request("q")).await.unwrap();

    assert!(response.cache_hit());
    assert_eq!(response.status, CacheStatus::Hit);
    let result = response.outcome.into_result().unwrap();
    assert_eq!(result, GenerationResult::from(entry));
    assert_eq!(backend.total_calls(), 0);
}

#[tokio::test]
async fn test_second_identical_request_hits() {
    let backend = MockBackend::new();
    let (orchestrator, _) = orchestrator_with(backend.clone());

    let first = orchestrator.generate_with_cache(request("q")).await.unwrap();
    let second = orchestrator.generate_with_cache(request("q")).await.unwrap();

    assert!(!first.cache_hit());
    assert!(second.cache_hit());
    assert_eq!(
        first.outcome.into_result().unwrap().text,
        second.outcome.into_result().unwrap().text
    );
    assert_eq!(backend.generate_calls(), 1);
}

#[tokio::test]
async fn test_hit_streaming_replays_in_fixed_chunks() {
    let backend = MockBackend::new();
    let (orchestrator, cache) = orchestrator_with(backend.clone());
    let text: String = "abcdefghij".repeat(12);
    cache
        .set("q", MODEL, 0.7, &CacheEntry::new(text.clone(), MODEL, 0.0))
        .await
        .unwrap();

    let response = orchestrator
        .generate_with_cache(request("q").streaming(true))
        .await
        .unwrap();
    assert!(response.cache_hit());

    let fragments = drain(response.outcome.into_stream().unwrap()).await;
    let texts = texts(&fragments);

    assert_eq!(texts.len(), 3 + 1);
    assert_eq!(texts[0].chars().count(), 50);
    assert_eq!(texts[1].chars().count(), 50);
    assert_eq!(texts[2].chars().count(), 20);
    assert_eq!(texts[..3].concat(), text);
    assert_eq!(texts[3], cached_metadata(MODEL));
    assert_eq!(backend.total_calls(), 0);
}

#[tokio::test]
async fn test_hit_streaming_suppresses_duplicate_trailer() {
    let (orchestrator, cache) = orchestrator_with(MockBackend::new());
    let text = format!("answer{}", live_metadata(MODEL, 0.5));
    cache
        .set("q", MODEL, 0.7, &CacheEntry::new(text.clone(), MODEL, 0.0))
        .await
        .unwrap();

    let response = orchestrator
        .generate_with_cache(request("q").streaming(true))
        .await
        .unwrap();
    let fragments = drain(response.outcome.into_stream().unwrap()).await;

    assert_eq!(texts(&fragments).concat(), text);
    assert!(fragments.iter().all(|f| !f.as_ref().unwrap().is_metadata()));
}

#[tokio::test]
async fn test_miss_streaming_forwards_and_commits_after_drain() {
    let backend = MockBackend::new()
        .with_fragments(["Hel", "lo, ", "world"])
        .with_latency(0.3);
    let (orchestrator, cache) = orchestrator_with(backend.clone());

    let response = orchestrator
        .generate_with_cache(request("greet").streaming(true).with_prompt_version("v2"))
        .await
        .unwrap();
    assert!(!response.cache_hit());

    let fragments = drain(response.outcome.into_stream().unwrap()).await;
    assert_eq!(
        texts(&fragments),
        vec!["Hel", "lo, ", "world", live_metadata(MODEL, 0.3).as_str()]
    );
    assert_eq!(backend.stream_calls(), 1);

    let cached = cache
        .get("greet", MODEL, 0.7)
        .await
        .unwrap()
        .into_entry()
        .expect("committed after drain");
    assert_eq!(cached.text, "Hello, world");
    assert_eq!(cached.model, MODEL);
    assert_eq!(cached.latency, 0.0);
    assert_eq!(cached.prompt_version.as_deref(), Some("v2"));
}

#[tokio::test]
async fn test_streamed_miss_then_streamed_hit() {
    let backend = MockBackend::new().with_fragments(["one ", "two"]);
    let (orchestrator, _) = orchestrator_with(backend.clone());

    let live = orchestrator
        .generate_with_cache(request("q").streaming(true))
        .await
        .unwrap();
    drain(live.outcome.into_stream().unwrap()).await;

    let replay = orchestrator
        .generate_with_cache(request("q").streaming(true))
        .await
        .unwrap();
    assert!(replay.cache_hit());
    let texts = texts(&drain(replay.outcome.into_stream().unwrap()).await);
    assert_eq!(texts, vec!["one two".to_string(), cached_metadata(MODEL)]);
    assert_eq!(backend.stream_calls(), 1);
}

#[tokio::test]
async fn test_cancelled_stream_is_not_cached() {
    let backend = MockBackend::new().with_fragments(["a", "b", "c"]);
    let (orchestrator, cache) = orchestrator_with(backend);

    let response = orchestrator
        .generate_with_cache(request("q").streaming(true))
        .await
        .unwrap();
    let mut stream = response.outcome.into_stream().unwrap();

    let first = stream.next().await.unwrap().unwrap();
    assert_eq!(first, StreamFragment::Text("a".into()));
    drop(stream);

    assert_eq!(cache.get("q", MODEL, 0.7).await.unwrap(), CacheLookup::Miss);
}

#[tokio::test]
async fn test_closed_stream_is_not_cached() {
    let backend = MockBackend::new().with_fragments(["a", "b"]);
    let (orchestrator, cache) = orchestrator_with(backend);

    let response = orchestrator
        .generate_with_cache(request("q").streaming(true))
        .await
        .unwrap();
    let mut stream = response.outcome.into_stream().unwrap();
    stream.next().await.unwrap().unwrap();
    stream.next().await.unwrap().unwrap();

    stream.close();
    assert!(stream.is_closed());
    assert!(stream.next().await.is_none());
    assert_eq!(cache.get("q", MODEL, 0.7).await.unwrap(), CacheLookup::Miss);
}

#[tokio::test]
async fn test_backend_failure_is_not_cached() {
    let backend = MockBackend::new().failing("503 from provider");
    let (orchestrator, cache) = orchestrator_with(backend.clone());

    let err = orchestrator
        .generate_with_cache(GenerationRequest::new("q", "req-42"))
        .await
        .unwrap_err();

    match err {
        OrchestratorError::Backend(e) => {
            assert_eq!(e.request_id, "req-42");
            assert_eq!(e.model, MODEL);
            assert_eq!(e.cause, "503 from provider");
        }
        other => panic!("expected backend error, got {other:?}"),
    }
    assert_eq!(backend.generate_calls(), 1);
    assert_eq!(cache.get("q", MODEL, 0.7).await.unwrap(), CacheLookup::Miss);
}

#[tokio::test]
async fn test_stream_open_failure_is_an_error() {
    let (orchestrator, _) = orchestrator_with(MockBackend::new().failing("bad key"));

    let err = orchestrator
        .generate_with_cache(request("q").streaming(true))
        .await
        .unwrap_err();
    assert!(matches!(err, OrchestratorError::Backend(_)));
}

#[tokio::test]
async fn test_mid_stream_failure_is_forwarded_and_not_cached() {
    let backend = MockBackend::new()
        .with_fragments(["a", "b", "c"])
        .failing_stream_after(2);
    let (orchestrator, cache) = orchestrator_with(backend);

    let response = orchestrator
        .generate_with_cache(request("q").streaming(true))
        .await
        .unwrap();
    let fragments = drain(response.outcome.into_stream().unwrap()).await;

    assert_eq!(fragments.len(), 3);
    assert!(fragments[0].is_ok());
    assert!(fragments[1].is_ok());
    assert!(matches!(fragments[2], Err(OrchestratorError::Backend(_))));
    assert_eq!(cache.get("q", MODEL, 0.7).await.unwrap(), CacheLookup::Miss);
}

#[tokio::test]
async fn test_key_ignores_max_tokens_and_prompt_version() {
    let backend = MockBackend::new();
    let (orchestrator, _) = orchestrator_with(backend.clone());

    orchestrator
        .generate_with_cache(request("q").with_max_tokens(10).with_prompt_version("v1"))
        .await
        .unwrap();
    let other = orchestrator
        .generate_with_cache(
            GenerationRequest::new("q", "another-request")
                .with_max_tokens(4000)
                .with_prompt_version("v2"),
        )
        .await
        .unwrap();

    assert!(other.cache_hit());
    assert_eq!(backend.generate_calls(), 1);
}

#[tokio::test]
async fn test_temperature_change_misses() {
    let backend = MockBackend::new();
    let (orchestrator, _) = orchestrator_with(backend.clone());

    orchestrator.generate_with_cache(request("q")).await.unwrap();
    let warmer = orchestrator
        .generate_with_cache(request("q").with_temperature(0.71))
        .await
        .unwrap();

    assert!(!warmer.cache_hit());
    assert_eq!(backend.generate_calls(), 2);
}

#[tokio::test]
async fn test_unavailable_cache_propagates_by_default() {
    let backend = MockBackend::new();
    let cache = CacheStore::new(Arc::new(FlakyStore::unavailable()));
    let orchestrator = ResponseOrchestrator::new(cache, Arc::new(backend.clone()), MODEL);
    assert_eq!(orchestrator.cache_error_policy(), CacheErrorPolicy::Propagate);

    let err = orchestrator.generate_with_cache(request("q")).await.unwrap_err();

    assert!(matches!(err, OrchestratorError::CacheUnavailable(_)));
    assert_eq!(backend.total_calls(), 0);
}

#[tokio::test]
async fn test_degrade_policy_serves_from_backend() {
    let backend = MockBackend::new();
    let cache = CacheStore::new(Arc::new(FlakyStore::unavailable()));
    let orchestrator = ResponseOrchestrator::new(cache, Arc::new(backend.clone()), MODEL)
        .with_cache_error_policy(CacheErrorPolicy::Degrade);

    let response = orchestrator.generate_with_cache(request("q")).await.unwrap();
    assert!(!response.cache_hit());
    assert_eq!(backend.generate_calls(), 1);

    let streamed = orchestrator
        .generate_with_cache(request("q").streaming(true))
        .await
        .unwrap();
    let fragments = drain(streamed.outcome.into_stream().unwrap()).await;
    assert!(fragments.iter().all(Result::is_ok));
}

#[tokio::test]
async fn test_write_failure_propagates_non_streaming() {
    let cache = CacheStore::new(Arc::new(FlakyStore::read_only()));
    let orchestrator = ResponseOrchestrator::new(cache, Arc::new(MockBackend::new()), MODEL);

    let err = orchestrator.generate_with_cache(request("q")).await.unwrap_err();
    assert!(matches!(err, OrchestratorError::CacheUnavailable(_)));
}

#[tokio::test]
async fn test_write_failure_ends_stream_with_error() {
    let cache = CacheStore::new(Arc::new(FlakyStore::read_only()));
    let backend = MockBackend::new().with_fragments(["x"]);
    let orchestrator = ResponseOrchestrator::new(cache, Arc::new(backend), MODEL);

    let response = orchestrator
        .generate_with_cache(request("q").streaming(true))
        .await
        .unwrap();
    let fragments = drain(response.outcome.into_stream().unwrap()).await;

    assert_eq!(fragments.len(), 3);
    assert!(fragments[1].as_ref().unwrap().is_metadata());
    assert!(matches!(
        fragments[2],
        Err(OrchestratorError::CacheUnavailable(_))
    ));
}

#[derive(Default)]
struct CountingTracer {
    events: Mutex<Vec<String>>,
}

impl GenerationTracer for CountingTracer {
    fn start_span(&self, span: &SpanStart<'_>) -> Result<SpanId, TraceError> {
        self.events
            .lock()
            .unwrap()
            .push(format!("start:{}:{}", span.name, span.request_id));
        Ok(SpanId(1))
    }

    fn end_span(&self, _id: SpanId, end: &SpanEnd<'_>) -> Result<(), TraceError> {
        self.events
            .lock()
            .unwrap()
            .push(format!(
                "end:{}:{}",
                end.cache_status,
                end.output.or(end.error).unwrap_or("-")
            ));
        Ok(())
    }
}

#[tokio::test]
async fn test_tracer_sees_miss_then_hit() {
    let tracer = Arc::new(CountingTracer::default());
    let backend = MockBackend::new().with_fragments(["ok"]);
    let (orchestrator, _) = orchestrator_with(backend);

    for _ in 0..2 {
        orchestrator
            .generate_with_cache(request("q").with_tracer(tracer.clone()))
            .await
            .unwrap();
    }

    let events = tracer.events.lock().unwrap();
    assert_eq!(
        *events,
        vec![
            "start:llm_generation:req-test",
            "end:MISS:ok",
            "start:llm_generation:req-test",
            "end:HIT:ok",
        ]
    );
}

#[tokio::test]
async fn test_tracer_span_for_stream_closes_on_commit() {
    let tracer = Arc::new(CountingTracer::default());
    let backend = MockBackend::new().with_fragments(["a", "b"]);
    let (orchestrator, _) = orchestrator_with(backend);

    let response = orchestrator
        .generate_with_cache(request("q").streaming(true).with_tracer(tracer.clone()))
        .await
        .unwrap();
    assert_eq!(tracer.events.lock().unwrap().len(), 1);

    drain(response.outcome.into_stream().unwrap()).await;
    assert_eq!(tracer.events.lock().unwrap().last().unwrap(), "end:MISS:ab");
}

#[tokio::test]
async fn test_tracer_span_for_cancelled_stream_ends_as_failure() {
    let tracer = Arc::new(CountingTracer::default());
    let backend = MockBackend::new().with_fragments(["a", "b", "c"]);
    let (orchestrator, _) = orchestrator_with(backend);

    let mut stream = orchestrator
        .generate_with_cache(request("q").streaming(true).with_tracer(tracer.clone()))
        .await
        .unwrap()
        .outcome
        .into_stream()
        .unwrap();
    stream.next().await.unwrap().unwrap();
    drop(stream);

    let events = tracer.events.lock().unwrap();
    assert_eq!(
        *events,
        vec![
            "start:llm_generation:req-test".to_string(),
            format!("end:MISS:{}", crate::telemetry::CANCELLED_REASON),
        ]
    );
}

#[tokio::test]
async fn test_tracer_span_for_closed_stream_ends_once() {
    let tracer = Arc::new(CountingTracer::default());
    let backend = MockBackend::new().with_fragments(["a", "b"]);
    let (orchestrator, _) = orchestrator_with(backend);

    let mut stream = orchestrator
        .generate_with_cache(request("q").streaming(true).with_tracer(tracer.clone()))
        .await
        .unwrap()
        .outcome
        .into_stream()
        .unwrap();
    stream.next().await.unwrap().unwrap();
    stream.close();
    drop(stream);

    let events = tracer.events.lock().unwrap();
    assert_eq!(events.len(), 2);
    assert!(events[1].starts_with("end:MISS:"));
}

#[tokio::test]
async fn test_tracer_span_reports_mid_stream_failure() {
    let tracer = Arc::new(CountingTracer::default());
    let backend = MockBackend::new()
        .with_fragments(["a", "b", "c"])
        .failing_stream_after(1);
    let (orchestrator, _) = orchestrator_with(backend);

    let response = orchestrator
        .generate_with_cache(request("q").streaming(true).with_tracer(tracer.clone()))
        .await
        .unwrap();
    let fragments = drain(response.outcome.into_stream().unwrap()).await;
    let Some(Err(OrchestratorError::Backend(cause))) = fragments.last() else {
        panic!("expected the stream to end with a backend error");
    };

    let events = tracer.events.lock().unwrap();
    assert_eq!(
        *events,
        vec![
            "start:llm_generation:req-test".to_string(),
            format!("end:MISS:{}", cause),
        ]
    );
}

#[test]
fn test_cache_error_policy_from_str() {
    assert_eq!(
        "propagate".parse::<CacheErrorPolicy>(),
        Ok(CacheErrorPolicy::Propagate)
    );
    assert_eq!(
        " Degrade ".parse::<CacheErrorPolicy>(),
        Ok(CacheErrorPolicy::Degrade)
    );
    assert!("sometimes".parse::<CacheErrorPolicy>().is_err());
}

#[test]
fn test_request_defaults() {
    let req = GenerationRequest::new("p", "id");
    assert_eq!(req.temperature(), 0.7);
    assert_eq!(req.max_tokens(), 1024);
    assert!(!req.is_streaming());
    assert_eq!(req.prompt_version(), None);
    assert!(format!("{req:?}").contains("prompt_len"));
}
