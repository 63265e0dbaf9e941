//! Infrastructure layer - Adapters for external systems
//!
//! Implements the application ports: SQLite persistence and queue broker,
//! the moka forecast cache, SMTP delivery with tera templates, and the cron
//! scheduler. Also owns configuration loading and logging setup.

pub mod adapters;
pub mod broker;
pub mod cache;
pub mod config;
pub mod persistence;
pub mod scheduler;
pub mod telemetry;
pub mod templates;

pub use adapters::*;
pub use broker::{DeadLetter, InMemoryQueueBroker, QueueError, SqliteQueueBroker};
pub use cache::{MokaCache, MokaCacheConfig};
pub use config::{AppConfig, Environment};
pub use persistence::{AsyncDatabase, AsyncDatabaseConfig, SqliteSubscriptionStore};
pub use scheduler::{SchedulerError, TaskScheduler, TaskStats};
pub use telemetry::{TelemetryError, init_logging, init_metrics};
pub use templates::{TemplateConfig, TemplateEngine, TemplateError};
