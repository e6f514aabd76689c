use thiserror::Error;

/// Failure inside a tracing hook. Never affects the response.
#[derive(Debug, Error)]
pub enum TraceError {
    #[error("trace exporter rejected span: {0}")]
    Rejected(String),

    #[error("unknown span id {0}")]
    UnknownSpan(u64),
}
