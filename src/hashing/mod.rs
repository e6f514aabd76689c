//! Cache key derivation.
//!
//! A key is the lowercase hex SHA-256 of `"<prompt>:<model>:<temperature>"`. Only those three
//! fields participate: `max_tokens`, the request id and the prompt version are deliberately
//! absent, so requests differing only in those fields share one entry.

use sha2::{Digest, Sha256};

/// Hex-encoded SHA-256 digest identifying one cache entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Returns the 64-character lowercase hex digest.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the key and returns the digest string.
    #[inline]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Renders a temperature the way keys have always been written.
///
/// Uses the shortest decimal that round-trips the `f64`, and keeps a trailing `.0` on
/// integral values so that `1.0` renders as `"1.0"` rather than `"1"`. `0.70` and `0.7` are the
/// same `f64` and therefore render identically.
///
/// Exponent notation is never used: `1e-5` renders as `"0.00001"` and `1e20` as
/// `"100000000000000000000.0"`. Stores shared with writers that emit exponents (`"1e-05"`)
/// will not agree on keys for such temperatures.
pub fn canonical_temperature(temperature: f64) -> String {
    let rendered = temperature.to_string();
    if temperature.is_finite() && !rendered.contains(['.', 'e', 'E']) {
        format!("{rendered}.0")
    } else {
        rendered
    }
}

/// Builds the canonical string that is hashed into a [`CacheKey`].
#[inline]
pub fn canonical_key_input(prompt: &str, model: &str, temperature: f64) -> String {
    format!("{}:{}:{}", prompt, model, canonical_temperature(temperature))
}

/// Derives the cache key for a `(prompt, model, temperature)` triple.
pub fn derive_cache_key(prompt: &str, model: &str, temperature: f64) -> CacheKey {
    let mut hasher = Sha256::new();
    hasher.update(canonical_key_input(prompt, model, temperature).as_bytes());
    CacheKey(format!("{:x}", hasher.finalize()))
}
