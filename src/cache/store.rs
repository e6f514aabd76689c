//! Key-value store seam and the in-process moka implementation.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use moka::Expiry;
use moka::sync::Cache;

use super::error::CacheResult;

/// External key-value store with per-key expiry (a Redis `GET`/`SETEX` shaped contract).
///
/// Expiry is enforced by the store; callers never delete keys.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Reads the value at `key`, or `None` if absent or expired.
    async fn get(&self, key: &str) -> CacheResult<Option<String>>;

    /// Writes `value` at `key`, replacing any previous value and resetting its expiry to `ttl`.
    async fn set_with_expiry(&self, key: &str, value: String, ttl: Duration) -> CacheResult<()>;

    /// Short identifier used in logs and errors.
    fn name(&self) -> &'static str;
}

#[derive(Debug, Clone)]
struct StoredValue {
    payload: Arc<str>,
    ttl: Duration,
}

struct PerEntryTtl;

impl Expiry<String, StoredValue> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &StoredValue,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &StoredValue,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// In-memory [`KeyValueStore`] bounded by entry count, with a TTL per write.
pub struct MemoryStore {
    entries: Cache<String, StoredValue>,
}

impl MemoryStore {
    const DEFAULT_CAPACITY: u64 = 10_000;

    /// Creates a store with the default capacity.
    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    /// Creates a store with a max entry capacity.
    pub fn with_capacity(capacity: u64) -> Self {
        Self {
            entries: Cache::builder()
                .max_capacity(capacity)
                .expire_after(PerEntryTtl)
                .build(),
        }
    }

    /// Returns the number of live entries (approximate until pending tasks run).
    pub fn len(&self) -> u64 {
        self.entries.entry_count()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.entry_count() == 0
    }

    /// Runs any pending maintenance tasks in the underlying cache.
    pub fn run_pending_tasks(&self) {
        self.entries.run_pending_tasks();
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("entries", &self.entries.entry_count())
            .finish()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        Ok(self.entries.get(key).map(|v| v.payload.to_string()))
    }

    async fn set_with_expiry(&self, key: &str, value: String, ttl: Duration) -> CacheResult<()> {
        self.entries.insert(
            key.to_string(),
            StoredValue {
                payload: Arc::from(value),
                ttl,
            },
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
