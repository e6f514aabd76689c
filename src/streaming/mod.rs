//! Stream aggregation: cached text to fragments, and live fragments to cached text.
//!
//! Both directions produce a [`GenerationStream`], so callers cannot tell a replay from a live
//! response except by the trailer.

mod chunks;


pub use chunks::TextChunks;

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures_util::stream::{self, BoxStream, Stream, StreamExt};
use tracing::debug;

use crate::backend::{FragmentStream, StreamFragment};
use crate::cache::CacheEntry;
use crate::constants::{REPLAY_CHUNK_SIZE, cached_metadata, has_metadata_marker};
use crate::orchestrator::OrchestratorError;

/// Item type delivered to streaming callers.
pub type FragmentResult = Result<StreamFragment, OrchestratorError>;

/// Pull-based fragment stream handed to callers.
///
/// Fragments are produced only as fast as they are polled. [`close`](Self::close), or dropping
/// the stream, cancels it: a live stream that is cancelled before exhaustion is never
/// committed to the cache.
pub struct GenerationStream {
    inner: Option<BoxStream<'static, FragmentResult>>,
}

impl GenerationStream {
    pub fn new(inner: BoxStream<'static, FragmentResult>) -> Self {
        Self { inner: Some(inner) }
    }

    /// Stops the stream. Later polls yield `None`.
    pub fn close(&mut self) {
        if self.inner.take().is_some() {
            debug!("generation stream closed by consumer");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.inner.is_none()
    }

    /// Drains the stream and concatenates every fragment, trailer included.
    pub async fn collect_text(mut self) -> Result<String, OrchestratorError> {
        let mut text = String::new();
        while let Some(fragment) = self.next().await {
            text.push_str(fragment?.as_str());
        }
        Ok(text)
    }
}

impl Stream for GenerationStream {
    type Item = FragmentResult;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        let Some(inner) = this.inner.as_mut() else {
            return Poll::Ready(None);
        };

        let polled = inner.poll_next_unpin(cx);
        if let Poll::Ready(None) = polled {
            this.inner = None;
        }
        polled
    }
}

impl std::fmt::Debug for GenerationStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationStream")
            .field("closed", &self.is_closed())
            .finish()
    }
}

enum Capture<F> {
    Forwarding {
        inner: FragmentStream,
        buffer: String,
        commit: F,
    },
    Done,
}

/// Converts between atomic cached text and fragment streams.
#[derive(Debug, Clone, Copy)]
pub struct StreamAggregator {
    chunk_size: usize,
}

impl Default for StreamAggregator {
    fn default() -> Self {
        Self::new(REPLAY_CHUNK_SIZE)
    }
}

impl StreamAggregator {
    /// Creates an aggregator replaying `chunk_size` characters per fragment (minimum 1).
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Replays a cached entry as fixed-size text fragments.
    ///
    /// A `\n\n[MODEL=<model> | CACHED]` trailer follows the data unless the cached text already
    /// carries a metadata marker. `fallback_model` names the trailer when the entry has no model.
    pub fn replay(&self, entry: CacheEntry, fallback_model: &str) -> GenerationStream {
        let trailer = if has_metadata_marker(&entry.text) {
            None
        } else if entry.model.is_empty() {
            Some(cached_metadata(fallback_model))
        } else {
            Some(cached_metadata(&entry.model))
        };

        let data = stream::iter(TextChunks::new(entry.text, self.chunk_size))
            .map(|chunk| Ok(StreamFragment::Text(chunk)));
        let trailer = stream::iter(trailer).map(|t| Ok(StreamFragment::Metadata(t)));

        GenerationStream::new(data.chain(trailer).boxed())
    }

    /// Forwards a live stream fragment by fragment while accumulating its text.
    ///
    /// Once `inner` is exhausted, `commit` receives the concatenated [`StreamFragment::Text`]
    /// fragments (trailers excluded). A commit error is yielded as the final item. If `inner`
    /// yields an error, it is forwarded and the stream ends without committing. If the consumer
    /// stops early, `commit` is never called.
    pub fn capture<F, Fut>(&self, inner: FragmentStream, commit: F) -> GenerationStream
    where
        F: FnOnce(String) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), OrchestratorError>> + Send + 'static,
    {
        let initial = Capture::Forwarding {
            inner,
            buffer: String::new(),
            commit,
        };

        let captured = stream::unfold(initial, |state| async move {
            let Capture::Forwarding {
                mut inner,
                mut buffer,
                commit,
            } = state
            else {
                return None;
            };

            match inner.next().await {
                Some(Ok(fragment)) => {
                    if let StreamFragment::Text(text) = &fragment {
                        buffer.push_str(text);
                    }
                    Some((
                        Ok(fragment),
                        Capture::Forwarding {
                            inner,
                            buffer,
                            commit,
                        },
                    ))
                }
                Some(Err(e)) => Some((Err(e.into()), Capture::Done)),
                None => match commit(buffer).await {
                    Ok(()) => None,
                    Err(e) => Some((Err(e), Capture::Done)),
                },
            }
        });

        GenerationStream::new(captured.boxed())
    }
}
