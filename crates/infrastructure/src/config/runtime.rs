//! Runtime tuning: public URL, scheduler cadences, dispatcher, consumer
//! workers, logging and metrics.

use std::time::Duration;

use application::{
    jobs::queues,
    services::{ConsumerConfig, DispatcherConfig},
};
use serde::{Deserialize, Serialize};

use super::default_true;
use crate::scheduler::schedules;

/// Public-facing HTTP settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Base URL used to build confirm and unsubscribe links
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
        }
    }
}

/// Cron cadences (six fields, UTC)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_hourly_cron")]
    pub hourly_cron: String,

    #[serde(default = "default_daily_cron")]
    pub daily_cron: String,
}

fn default_hourly_cron() -> String {
    schedules::HOURLY.to_string()
}

fn default_daily_cron() -> String {
    schedules::DAILY_7AM.to_string()
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            hourly_cron: default_hourly_cron(),
            daily_cron: default_daily_cron(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DispatcherSettings {
    /// Cities resolved concurrently within one run (default: 4)
    #[serde(default = "default_max_concurrent_cities")]
    pub max_concurrent_cities: usize,
}

const fn default_max_concurrent_cities() -> usize {
    4
}

impl Default for DispatcherSettings {
    fn default() -> Self {
        Self {
            max_concurrent_cities: default_max_concurrent_cities(),
        }
    }
}

/// Queue consumer settings
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ConsumerSettings {
    /// Workers polling each queue (default: 2)
    #[serde(default = "default_workers_per_queue")]
    pub workers_per_queue: usize,

    /// Sleep between polls of an empty queue in milliseconds (default: 500)
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Dead-letter a transiently failing job after this many deliveries.
    /// Unset means retry forever.
    #[serde(default = "default_max_deliveries")]
    pub max_deliveries: Option<u32>,

    /// Seconds before an unacknowledged delivery becomes visible again
    #[serde(default = "default_visibility_timeout_secs")]
    pub visibility_timeout_secs: u64,
}

const fn default_workers_per_queue() -> usize {
    2
}

const fn default_poll_interval_ms() -> u64 {
    500
}

#[allow(clippy::unnecessary_wraps)] // serde default fn
const fn default_max_deliveries() -> Option<u32> {
    Some(10)
}

const fn default_visibility_timeout_secs() -> u64 {
    30
}

impl Default for ConsumerSettings {
    fn default() -> Self {
        Self {
            workers_per_queue: default_workers_per_queue(),
            poll_interval_ms: default_poll_interval_ms(),
            max_deliveries: default_max_deliveries(),
            visibility_timeout_secs: default_visibility_timeout_secs(),
        }
    }
}

impl ConsumerSettings {
    #[must_use]
    pub const fn visibility_timeout(&self) -> Duration {
        Duration::from_secs(self.visibility_timeout_secs)
    }
}

/// Log output settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// Prometheus exporter for the long-running commands
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Serve `/metrics` while `dispatcher` or `consumer` runs
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_metrics_listen")]
    pub listen: String,
}

fn default_metrics_listen() -> String {
    "127.0.0.1:9464".to_string()
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen: default_metrics_listen(),
        }
    }
}

/// Build the dispatcher config from its settings and the public URL
#[must_use]
pub fn dispatcher_config(http: &HttpConfig, settings: DispatcherSettings) -> DispatcherConfig {
    DispatcherConfig {
        base_url: http.base_url.trim_end_matches('/').to_string(),
        max_concurrent_cities: settings.max_concurrent_cities.max(1),
    }
}

/// Build the consumer config for every notification queue
#[must_use]
pub fn consumer_config(settings: ConsumerSettings) -> ConsumerConfig {
    ConsumerConfig {
        queues: queues::ALL.iter().map(ToString::to_string).collect(),
        workers_per_queue: settings.workers_per_queue.max(1),
        poll_interval: Duration::from_millis(settings.poll_interval_ms),
        max_deliveries: settings.max_deliveries,
    }
}
