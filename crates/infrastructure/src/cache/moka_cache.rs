//! Moka in-memory cache
//!
//! Each entry carries its own TTL through moka's `Expiry` hook, so one cache
//! can hold both hour-bucketed and day-bucketed forecasts.

use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::{Duration, Instant},
};

use application::ports::{CacheError, CachePort, CacheStats};
use async_trait::async_trait;
use moka::{Expiry, future::Cache};
use tracing::{debug, instrument};

/// Default cache budget in megabytes
const DEFAULT_MAX_CAPACITY_MB: u64 = 64;

/// Configuration for [`MokaCache`]
#[derive(Debug, Clone, Copy)]
pub struct MokaCacheConfig {
    /// Maximum capacity in megabytes, weighed by payload size
    pub max_capacity_mb: u64,
}

impl Default for MokaCacheConfig {
    fn default() -> Self {
        Self {
            max_capacity_mb: DEFAULT_MAX_CAPACITY_MB,
        }
    }
}

#[derive(Debug, Clone)]
struct Entry {
    bytes: Vec<u8>,
    ttl: Duration,
}

/// Expires an entry `ttl` after its last write
struct PerEntryTtl;

impl Expiry<String, Entry> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &Entry,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &Entry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// Moka-based in-memory cache
pub struct MokaCache {
    cache: Cache<String, Entry>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl std::fmt::Debug for MokaCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MokaCache")
            .field("entries", &self.cache.entry_count())
            .field("hits", &self.hits.load(Ordering::Relaxed))
            .field("misses", &self.misses.load(Ordering::Relaxed))
            .finish()
    }
}

impl MokaCache {
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(MokaCacheConfig::default())
    }

    #[must_use]
    pub fn with_config(config: MokaCacheConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(config.max_capacity_mb * 1024 * 1024)
            .weigher(|key: &String, value: &Entry| -> u32 {
                (key.len() + value.bytes.len())
                    .try_into()
                    .unwrap_or(u32::MAX)
            })
            .expire_after(PerEntryTtl)
            .build();

        Self {
            cache,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }
}

impl Default for MokaCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CachePort for MokaCache {
    #[instrument(skip(self), level = "debug")]
    async fn get_bytes(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        match self.cache.get(key).await {
            Some(entry) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!(key = %key, "Cache hit");
                Ok(Some(entry.bytes))
            },
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                debug!(key = %key, "Cache miss");
                Ok(None)
            },
        }
    }

    #[instrument(skip(self, value), level = "debug")]
    async fn set_bytes(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError> {
        if ttl.is_zero() {
            return Err(CacheError::Backend(format!("zero TTL for key {key}")));
        }

        self.cache
            .insert(key.to_string(), Entry { bytes: value, ttl })
            .await;
        debug!(key = %key, ttl_secs = ttl.as_secs(), "Cache set");
        Ok(())
    }

    fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.cache.entry_count(),
        }
    }
}
