use thiserror::Error;

use crate::backend::BackendError;
use crate::cache::CacheError;
use crate::prompt::PromptError;

/// Failure of one orchestrated request. A cache miss is not an error.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// Cache read or write failed under [`CacheErrorPolicy::Propagate`](super::CacheErrorPolicy).
    #[error("cache unavailable: {0}")]
    CacheUnavailable(#[from] CacheError),

    #[error(transparent)]
    Backend(#[from] BackendError),

    /// Raised before any cache or backend interaction.
    #[error("prompt resolution failed: {0}")]
    PromptResolution(#[from] PromptError),
}

pub type OrchestratorResult<T> = Result<T, OrchestratorError>;
