//! Response cache over an expiring key-value store.

pub mod error;
pub mod response;
pub mod store;
pub mod types;


pub use error::{CacheError, CacheResult};
pub use response::CacheStore;
pub use store::{KeyValueStore, MemoryStore};
pub use types::{
    CacheEntry, CacheLookup, CacheStatus, LLMGATE_CACHE_HEADER, LLMGATE_REQUEST_ID_HEADER,
};
