use thiserror::Error;

#[derive(Debug, Error)]
/// Errors returned by the response cache.
pub enum CacheError {
    /// The backing key-value store could not be reached or refused the operation.
    #[error("cache store '{store}' unavailable: {reason}")]
    Unavailable {
        /// Store name (see [`KeyValueStore::name`](super::KeyValueStore::name)).
        store: &'static str,
        /// Error message.
        reason: String,
    },

    /// A stored value did not decode as a cache entry.
    #[error("corrupt cache entry at key {key}: {source}")]
    Corrupt {
        /// Hex cache key.
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// An entry could not be encoded for storage.
    #[error("failed to encode cache entry: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Convenience result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;
