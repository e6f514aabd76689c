//! Cross-cutting, shared constants.
//!
//! The metadata marker and trailer formats are part of the streaming text protocol seen by
//! callers; the replay path and the live path must agree on them.

use std::time::Duration;

/// Default time-to-live for a cache write, in seconds.
pub const DEFAULT_CACHE_TTL_SECS: u64 = 3600;

/// Default time-to-live for a cache write.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(DEFAULT_CACHE_TTL_SECS);

/// Fragment size (in characters) used when replaying a cached text as a stream.
pub const REPLAY_CHUNK_SIZE: usize = 50;

/// Prefix of every synthesized trailing metadata fragment.
pub const METADATA_MARKER: &str = "\n\n[MODEL=";

/// Default sampling temperature for chat requests.
pub const DEFAULT_TEMPERATURE: f64 = 0.7;

/// Default output token budget for chat requests.
pub const DEFAULT_MAX_TOKENS: u32 = 1024;

/// Temperature used by the summarization route.
pub const SUMMARIZE_TEMPERATURE: f64 = 0.3;

/// Trailer appended to a live stream: `\n\n[MODEL=<model> | LATENCY=<secs, 2dp>s]`.
pub fn live_metadata(model: &str, latency_secs: f64) -> String {
    format!("{METADATA_MARKER}{model} | LATENCY={latency_secs:.2}s]")
}

/// Trailer appended to a cache replay: `\n\n[MODEL=<model> | CACHED]`.
pub fn cached_metadata(model: &str) -> String {
    format!("{METADATA_MARKER}{model} | CACHED]")
}

/// Returns `true` if `text` already carries a metadata trailer.
#[inline]
pub fn has_metadata_marker(text: &str) -> bool {
    text.contains(METADATA_MARKER)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_live_metadata_format() {
        assert_eq!(
            live_metadata("gemini-2.0-flash", 0.4567),
            "\n\n[MODEL=gemini-2.0-flash | LATENCY=0.46s]"
        );
        assert_eq!(live_metadata("m", 2.0), "\n\n[MODEL=m | LATENCY=2.00s]");
    }

    #[test]
    fn test_cached_metadata_format() {
        assert_eq!(cached_metadata("m"), "\n\n[MODEL=m | CACHED]");
    }

    #[test]
    fn test_marker_detection() {
        assert!(has_metadata_marker(&cached_metadata("m")));
        assert!(has_metadata_marker(&format!("body{}", live_metadata("m", 1.0))));
        assert!(!has_metadata_marker("[MODEL=m] without leading newlines"));
        assert!(!has_metadata_marker(""));
    }

    #[test]
    fn test_default_ttl_matches_secs() {
        assert_eq!(DEFAULT_CACHE_TTL.as_secs(), DEFAULT_CACHE_TTL_SECS);
    }
}
