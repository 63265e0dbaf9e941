//! Cache-aside decorator for `WeatherPort`
//!
//! Keys are bucketed on the injected clock so a bucket rolls over on the
//! hour (current conditions) or at midnight UTC (day outlook):
//!
//! ```text
//! <lowercase city>:%Y-%m-%d:%H-00   current, TTL 1h
//! <lowercase city>:%Y-%m-%d         day, TTL 24h
//! ```
//!
//! The cache never fails a request. A broken backend or an undecodable
//! entry degrades to a call through to the inner port.

use std::{sync::Arc, time::Duration};

use application::{
    error::ApplicationError,
    ports::{CacheError, CachePort, ClockPort, WeatherPort, ttl},
};
use async_trait::async_trait;
use domain::{City, DayWeatherSnapshot, WeatherSnapshot};
use serde::{Serialize, de::DeserializeOwned};
use tracing::{debug, error, instrument, warn};

const CACHE_HITS: &str = "weather_cache_hits_total";
const CACHE_MISSES: &str = "weather_cache_misses_total";

/// Caching decorator for weather ports
pub struct CachedWeatherAdapter<W: WeatherPort> {
    inner: W,
    cache: Arc<dyn CachePort>,
    clock: Arc<dyn ClockPort>,
}

impl<W: WeatherPort> std::fmt::Debug for CachedWeatherAdapter<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedWeatherAdapter")
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

impl<W: WeatherPort> CachedWeatherAdapter<W> {
    pub fn new(inner: W, cache: Arc<dyn CachePort>, clock: Arc<dyn ClockPort>) -> Self {
        Self {
            inner,
            cache,
            clock,
        }
    }

    fn current_key(&self, city: &City) -> String {
        format!(
            "{}:{}",
            city.cache_key_part(),
            self.clock.now().format("%Y-%m-%d:%H-00")
        )
    }

    fn day_key(&self, city: &City) -> String {
        format!(
            "{}:{}",
            city.cache_key_part(),
            self.clock.now().format("%Y-%m-%d")
        )
    }

    /// Cached value for `key`, or `None` on miss, backend error or bad entry
    async fn lookup<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let bytes = match self.cache.get_bytes(key).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                metrics::counter!(CACHE_MISSES).increment(1);
                debug!(key, "Weather cache miss");
                return None;
            },
            Err(e) => {
                log_cache_error(key, "read", &e);
                return None;
            },
        };

        match serde_json::from_slice(&bytes) {
            Ok(value) => {
                metrics::counter!(CACHE_HITS).increment(1);
                debug!(key, "Weather cache hit");
                Some(value)
            },
            Err(e) => {
                warn!(key, error = %e, "Discarding undecodable weather cache entry");
                None
            },
        }
    }

    /// Best-effort write; failures are logged only
    async fn store<T: Serialize + Sync>(&self, key: &str, value: &T, ttl: Duration) {
        let bytes = match serde_json::to_vec(value) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(key, error = %e, "Failed to encode weather for cache");
                return;
            },
        };

        if let Err(e) = self.cache.set_bytes(key, bytes, ttl).await {
            log_cache_error(key, "write", &e);
        }
    }
}

fn log_cache_error(key: &str, op: &str, e: &CacheError) {
    match e {
        CacheError::Unavailable(_) => error!(key, op, error = %e, "Weather cache unavailable"),
        CacheError::Backend(_) => warn!(key, op, error = %e, "Weather cache error"),
    }
}

#[async_trait]
impl<W: WeatherPort> WeatherPort for CachedWeatherAdapter<W> {
    #[instrument(skip(self), fields(city = %city))]
    async fn get_current_weather(&self, city: &City) -> Result<WeatherSnapshot, ApplicationError> {
        let key = self.current_key(city);
        if let Some(cached) = self.lookup(&key).await {
            return Ok(cached);
        }

        let fresh = self.inner.get_current_weather(city).await?;
        self.store(&key, &fresh, ttl::CURRENT_WEATHER).await;
        Ok(fresh)
    }

    #[instrument(skip(self), fields(city = %city))]
    async fn get_day_weather(&self, city: &City) -> Result<DayWeatherSnapshot, ApplicationError> {
        let key = self.day_key(city);
        if let Some(cached) = self.lookup(&key).await {
            return Ok(cached);
        }

        let fresh = self.inner.get_day_weather(city).await?;
        self.store(&key, &fresh, ttl::DAY_WEATHER).await;
        Ok(fresh)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use application::ports::{CacheStats, ManualClock};
    use chrono::{TimeZone, Utc};
    use parking_lot::Mutex;

    use super::*;
    use crate::cache::MokaCache;

    #[derive(Clone, Default)]
    struct CountingWeather {
        current: Arc<AtomicUsize>,
        day: Arc<AtomicUsize>,
        fail: bool,
    }

    #[async_trait]
    impl WeatherPort for CountingWeather {
        async fn get_current_weather(
            &self,
            _city: &City,
        ) -> Result<WeatherSnapshot, ApplicationError> {
            let calls = self.current.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(ApplicationError::ExternalService("down".into()));
            }
            #[allow(clippy::cast_precision_loss)]
            let temperature = 20.0 + calls as f32;
            Ok(WeatherSnapshot::new(temperature, 50.0, "Clear"))
        }

        async fn get_day_weather(
            &self,
            _city: &City,
        ) -> Result<DayWeatherSnapshot, ApplicationError> {
            self.day.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(ApplicationError::CityNotFound("Atlantis".into()));
            }
            Ok(DayWeatherSnapshot::default())
        }
    }

    /// Cache whose every call fails with the configured error
    #[derive(Debug)]
    struct BrokenCache {
        error: CacheError,
        writes: Mutex<usize>,
    }

    #[async_trait]
    impl CachePort for BrokenCache {
        async fn get_bytes(&self, _key: &str) -> Result<Option<Vec<u8>>, CacheError> {
            Err(self.error.clone())
        }

        async fn set_bytes(
            &self,
            _key: &str,
            _value: Vec<u8>,
            _ttl: Duration,
        ) -> Result<(), CacheError> {
            *self.writes.lock() += 1;
            Err(self.error.clone())
        }

        fn stats(&self) -> CacheStats {
            CacheStats::default()
        }
    }

    fn clock() -> Arc<ManualClock> {
        Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2025, 5, 17, 7, 10, 0).unwrap(),
        ))
    }

    fn kyiv() -> City {
        City::new("Kyiv").unwrap()
    }

    #[tokio::test]
    async fn hit_avoids_upstream() {
        let upstream = CountingWeather::default();
        let adapter =
            CachedWeatherAdapter::new(upstream.clone(), Arc::new(MokaCache::new()), clock());

        let first = adapter.get_current_weather(&kyiv()).await.unwrap();
        let second = adapter.get_current_weather(&kyiv()).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(upstream.current.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn hourly_bucket_rolls_over_on_the_hour() {
        let upstream = CountingWeather::default();
        let clock = clock();
        let adapter =
            CachedWeatherAdapter::new(upstream.clone(), Arc::new(MokaCache::new()), clock.clone());

        adapter.get_current_weather(&kyiv()).await.unwrap();
        clock.set(Utc.with_ymd_and_hms(2025, 5, 17, 7, 59, 59).unwrap());
        adapter.get_current_weather(&kyiv()).await.unwrap();
        assert_eq!(upstream.current.load(Ordering::SeqCst), 1);

        clock.set(Utc.with_ymd_and_hms(2025, 5, 17, 8, 0, 0).unwrap());
        let fresh = adapter.get_current_weather(&kyiv()).await.unwrap();

        assert_eq!(upstream.current.load(Ordering::SeqCst), 2);
        assert!((fresh.temperature - 21.0).abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn day_bucket_is_shared_across_hours() {
        let upstream = CountingWeather::default();
        let clock = clock();
        let adapter =
            CachedWeatherAdapter::new(upstream.clone(), Arc::new(MokaCache::new()), clock.clone());

        adapter.get_day_weather(&kyiv()).await.unwrap();
        clock.set(Utc.with_ymd_and_hms(2025, 5, 17, 23, 0, 0).unwrap());
        adapter.get_day_weather(&kyiv()).await.unwrap();
        assert_eq!(upstream.day.load(Ordering::SeqCst), 1);

        clock.set(Utc.with_ymd_and_hms(2025, 5, 18, 0, 0, 0).unwrap());
        adapter.get_day_weather(&kyiv()).await.unwrap();
        assert_eq!(upstream.day.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn key_ignores_city_case() {
        let upstream = CountingWeather::default();
        let adapter =
            CachedWeatherAdapter::new(upstream.clone(), Arc::new(MokaCache::new()), clock());

        adapter.get_current_weather(&kyiv()).await.unwrap();
        adapter
            .get_current_weather(&City::new("KYIV").unwrap())
            .await
            .unwrap();

        assert_eq!(upstream.current.load(Ordering::SeqCst), 1);
        assert_eq!(adapter.current_key(&kyiv()), "kyiv:2025-05-17:07-00");
        assert_eq!(adapter.day_key(&kyiv()), "kyiv:2025-05-17");
    }

    #[tokio::test]
    async fn unavailable_backend_degrades_to_pass_through() {
        let upstream = CountingWeather::default();
        let cache = Arc::new(BrokenCache {
            error: CacheError::Unavailable("connection refused".into()),
            writes: Mutex::new(0),
        });
        let adapter = CachedWeatherAdapter::new(upstream.clone(), cache.clone(), clock());

        adapter.get_current_weather(&kyiv()).await.unwrap();
        adapter.get_current_weather(&kyiv()).await.unwrap();

        assert_eq!(upstream.current.load(Ordering::SeqCst), 2);
        assert_eq!(*cache.writes.lock(), 2);
    }

    #[tokio::test]
    async fn undecodable_entry_is_refetched_and_overwritten() {
        let upstream = CountingWeather::default();
        let cache = Arc::new(MokaCache::new());
        cache
            .set_bytes("kyiv:2025-05-17:07-00", b"not json".to_vec(), ttl::CURRENT_WEATHER)
            .await
            .unwrap();
        let adapter = CachedWeatherAdapter::new(upstream.clone(), cache.clone(), clock());

        adapter.get_current_weather(&kyiv()).await.unwrap();
        adapter.get_current_weather(&kyiv()).await.unwrap();

        assert_eq!(upstream.current.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn upstream_errors_propagate_and_are_not_cached() {
        let upstream = CountingWeather {
            fail: true,
            ..CountingWeather::default()
        };
        let cache = Arc::new(MokaCache::new());
        let adapter = CachedWeatherAdapter::new(upstream.clone(), cache.clone(), clock());

        let err = adapter.get_day_weather(&kyiv()).await.unwrap_err();
        assert!(matches!(err, ApplicationError::CityNotFound(_)));
        assert!(adapter.get_day_weather(&kyiv()).await.is_err());

        assert_eq!(upstream.day.load(Ordering::SeqCst), 2);
        assert_eq!(cache.get_bytes("kyiv:2025-05-17").await.unwrap(), None);
    }

    mod key_properties {
        use proptest::prelude::*;

        use super::*;

        fn adapter_at(secs: i64) -> (CachedWeatherAdapter<CountingWeather>, Arc<ManualClock>) {
            let clock = Arc::new(ManualClock::new(Utc.timestamp_opt(secs, 0).unwrap()));
            let adapter = CachedWeatherAdapter::new(
                CountingWeather::default(),
                Arc::new(MokaCache::new()),
                clock.clone(),
            );
            (adapter, clock)
        }

        proptest! {
            #[test]
            fn current_key_is_stable_within_an_hour(
                hour in 0i64..500_000,
                a in 0i64..3600,
                b in 0i64..3600,
            ) {
                let city = City::new("Kyiv").unwrap();
                let (adapter, clock) = adapter_at(hour * 3600 + a);
                let first = adapter.current_key(&city);
                clock.set(Utc.timestamp_opt(hour * 3600 + b, 0).unwrap());
                prop_assert_eq!(first, adapter.current_key(&city));
            }

            #[test]
            fn current_key_changes_every_hour(hour in 0i64..500_000, offset in 0i64..3600) {
                let city = City::new("Lviv").unwrap();
                let (adapter, clock) = adapter_at(hour * 3600 + offset);
                let first = adapter.current_key(&city);
                clock.advance(chrono::Duration::hours(1));
                prop_assert_ne!(first, adapter.current_key(&city));
            }

            #[test]
            fn day_key_is_stable_within_a_utc_day(
                day in 0i64..20_000,
                a in 0i64..86_400,
                b in 0i64..86_400,
            ) {
                let city = City::new("Odesa").unwrap();
                let (adapter, clock) = adapter_at(day * 86_400 + a);
                let first = adapter.day_key(&city);
                clock.set(Utc.timestamp_opt(day * 86_400 + b, 0).unwrap());
                prop_assert_eq!(first, adapter.day_key(&city));
            }
        }
    }
}
