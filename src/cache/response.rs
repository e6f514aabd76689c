//! Response cache: key derivation and the JSON wire format over a [`KeyValueStore`].

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, instrument};

use super::error::{CacheError, CacheResult};
use super::store::KeyValueStore;
use super::types::{CacheEntry, CacheLookup};
use crate::constants::DEFAULT_CACHE_TTL;
use crate::hashing::{CacheKey, derive_cache_key};

/// Shared handle to the response cache. Cloning is cheap.
#[derive(Clone)]
pub struct CacheStore {
    store: Arc<dyn KeyValueStore>,
    default_ttl: Duration,
}

impl CacheStore {
    /// Creates a cache over `store` with the default TTL.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_default_ttl(store, DEFAULT_CACHE_TTL)
    }

    /// Creates a cache whose writes expire after `default_ttl` unless overridden.
    pub fn with_default_ttl(store: Arc<dyn KeyValueStore>, default_ttl: Duration) -> Self {
        Self { store, default_ttl }
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    pub fn store_name(&self) -> &'static str {
        self.store.name()
    }

    /// Derives the key for a `(prompt, model, temperature)` triple.
    #[inline]
    pub fn key(&self, prompt: &str, model: &str, temperature: f64) -> CacheKey {
        derive_cache_key(prompt, model, temperature)
    }

    /// Reads and decodes the entry for a triple.
    ///
    /// Store failures and undecodable values are returned as errors; the caller decides
    /// whether they abort the request.
    #[instrument(skip(self, prompt), fields(prompt_len = prompt.len(), model = model, temperature = temperature))]
    pub async fn get(&self, prompt: &str, model: &str, temperature: f64) -> CacheResult<CacheLookup> {
        let key = self.key(prompt, model, temperature);
        let Some(raw) = self.store.get(key.as_str()).await? else {
            debug!(key = %key, "cache key absent");
            return Ok(CacheLookup::Miss);
        };

        let entry: CacheEntry = serde_json::from_str(&raw).map_err(|source| CacheError::Corrupt {
            key: key.into_string(),
            source,
        })?;
        Ok(CacheLookup::Hit(entry))
    }

    /// Writes `entry` with the default TTL.
    pub async fn set(
        &self,
        prompt: &str,
        model: &str,
        temperature: f64,
        entry: &CacheEntry,
    ) -> CacheResult<()> {
        self.set_with_ttl(prompt, model, temperature, entry, self.default_ttl)
            .await
    }

    /// Writes `entry` with an explicit TTL.
    #[instrument(skip(self, prompt, entry), fields(prompt_len = prompt.len(), model = model, temperature = temperature, ttl_secs = ttl.as_secs()))]
    pub async fn set_with_ttl(
        &self,
        prompt: &str,
        model: &str,
        temperature: f64,
        entry: &CacheEntry,
        ttl: Duration,
    ) -> CacheResult<()> {
        let key = self.key(prompt, model, temperature);
        let value = serde_json::to_string(entry).map_err(CacheError::Encode)?;
        self.store.set_with_expiry(key.as_str(), value, ttl).await?;
        debug!(key = %key, text_len = entry.text.len(), "cache entry written");
        Ok(())
    }
}

impl std::fmt::Debug for CacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheStore")
            .field("store", &self.store.name())
            .field("default_ttl", &self.default_ttl)
            .finish()
    }
}
