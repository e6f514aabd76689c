use serde::{Deserialize, Serialize};

use crate::backend::GenerationResult;

pub const LLMGATE_CACHE_HEADER: &str = "X-Llmgate-Cache";
pub const LLMGATE_REQUEST_ID_HEADER: &str = "X-Request-ID";

/// One cached response, stored as JSON under its [`CacheKey`](crate::hashing::CacheKey).
///
/// Wire format: `{"text": .., "model": .., "latency": .., "prompt_version": ..}` where
/// `prompt_version` may be `null` or absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub text: String,
    pub model: String,
    /// Seconds. Entries captured from a live stream always record `0`.
    pub latency: f64,
    #[serde(default)]
    pub prompt_version: Option<String>,
}

impl CacheEntry {
    pub fn new(text: impl Into<String>, model: impl Into<String>, latency: f64) -> Self {
        Self {
            text: text.into(),
            model: model.into(),
            latency,
            prompt_version: None,
        }
    }

    pub fn with_prompt_version(mut self, prompt_version: Option<String>) -> Self {
        self.prompt_version = prompt_version;
        self
    }
}

impl From<GenerationResult> for CacheEntry {
    fn from(result: GenerationResult) -> Self {
        Self::new(result.text, result.model, result.latency)
    }
}

impl From<CacheEntry> for GenerationResult {
    fn from(entry: CacheEntry) -> Self {
        Self {
            text: entry.text,
            model: entry.model,
            latency: entry.latency,
        }
    }
}

/// Outcome of a cache read.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheLookup {
    Hit(CacheEntry),
    Miss,
}

impl CacheLookup {
    pub fn status(&self) -> CacheStatus {
        match self {
            CacheLookup::Hit(_) => CacheStatus::Hit,
            CacheLookup::Miss => CacheStatus::Miss,
        }
    }

    pub fn is_hit(&self) -> bool {
        matches!(self, CacheLookup::Hit(_))
    }

    pub fn into_entry(self) -> Option<CacheEntry> {
        match self {
            CacheLookup::Hit(entry) => Some(entry),
            CacheLookup::Miss => None,
        }
    }
}

impl From<Option<CacheEntry>> for CacheLookup {
    fn from(entry: Option<CacheEntry>) -> Self {
        entry.map_or(CacheLookup::Miss, CacheLookup::Hit)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheStatus {
    Hit,
    Miss,
}

impl CacheStatus {
    #[inline]
    pub fn as_header_value(&self) -> &'static str {
        match self {
            CacheStatus::Hit => "HIT",
            CacheStatus::Miss => "MISS",
        }
    }

    #[inline]
    pub fn is_hit(&self) -> bool {
        matches!(self, CacheStatus::Hit)
    }
}

impl std::fmt::Display for CacheStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_header_value())
    }
}
