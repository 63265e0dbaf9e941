//! Cache port definition
//!
//! Byte-oriented cache used in front of the weather providers. A missing key
//! and a broken backend are different outcomes: `Ok(None)` is a miss, `Err`
//! means the backend could not answer.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// Cache backend failures
///
/// Callers treat every variant as non-fatal; the split only drives log
/// severity.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheError {
    /// Backend could not be reached (connection refused, closed, timed out)
    #[error("cache backend unavailable: {0}")]
    Unavailable(String),

    /// Backend answered with an error
    #[error("cache backend error: {0}")]
    Backend(String),
}

/// Cache port for storing and retrieving cached values
///
/// Implementations must be thread-safe. Values are raw bytes; callers own
/// serialization.
#[async_trait]
pub trait CachePort: Send + Sync + std::fmt::Debug {
    /// Get a cached value by key
    ///
    /// Returns `Ok(None)` if the key doesn't exist or has expired.
    async fn get_bytes(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    /// Set a cached value with a time-to-live
    ///
    /// If the key already exists, its value and TTL are replaced.
    async fn set_bytes(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Duration,
    ) -> Result<(), CacheError>;

    /// Get cache statistics (hits, misses, size)
    fn stats(&self) -> CacheStats;
}

/// Cache statistics for monitoring
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    /// Number of cache hits
    pub hits: u64,
    /// Number of cache misses
    pub misses: u64,
    /// Current number of entries
    pub entries: u64,
}

impl CacheStats {
    /// Calculate the hit rate as a fraction (0.0 - 1.0)
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// TTLs for cached weather
pub mod ttl {
    use std::time::Duration;

    /// Current conditions, one hour bucket
    pub const CURRENT_WEATHER: Duration = Duration::from_secs(60 * 60);

    /// Day outlook, one day bucket
    pub const DAY_WEATHER: Duration = Duration::from_secs(24 * 60 * 60);
}
