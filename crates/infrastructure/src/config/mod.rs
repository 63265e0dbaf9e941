//! Application configuration
//!
//! Split into focused sub-modules:
//! - `database`: SQLite settings
//! - `cache`: forecast cache budget
//! - `weather`: provider keys and fallback order
//! - `email`: SMTP transport, subjects, template overrides
//! - `runtime`: public URL, scheduler, dispatcher, consumer, logging
//!
//! Values come from an optional `config.toml`, overridden by environment
//! variables such as `WEATHERFAN_SMTP__HOST`.

mod cache;
mod database;
mod email;
mod runtime;
mod weather;

use std::{fmt, path::Path};

use serde::{Deserialize, Serialize};
use tracing::warn;

pub use cache::CacheConfig;
pub use database::DatabaseConfig;
pub use email::{EmailConfig, SmtpConfig};
pub use runtime::{
    ConsumerSettings, DispatcherSettings, HttpConfig, LoggingConfig, MetricsConfig,
    SchedulerConfig, consumer_config, dispatcher_config,
};
pub use weather::{ProviderSettings, WeatherConfig};

/// Environment variable prefix
pub const ENV_PREFIX: &str = "WEATHERFAN";

/// Shared default for boolean `true` fields across config structs
pub(crate) const fn default_true() -> bool {
    true
}

/// Application environment (development or production)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Development => write!(f, "development"),
            Self::Production => write!(f, "production"),
        }
    }
}

impl std::str::FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            _ => Err(format!(
                "Invalid environment: {s}. Use 'development' or 'production'"
            )),
        }
    }
}

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub environment: Environment,

    #[serde(default)]
    pub http: HttpConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub weather: WeatherConfig,

    #[serde(default)]
    pub smtp: SmtpConfig,

    #[serde(default)]
    pub email: EmailConfig,

    #[serde(default)]
    pub scheduler: SchedulerConfig,

    #[serde(default)]
    pub dispatcher: DispatcherSettings,

    #[serde(default)]
    pub consumer: ConsumerSettings,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl AppConfig {
    /// Load `config.toml` from the working directory if present, then apply
    /// environment overrides
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from(None)
    }

    /// Load from an explicit file, or `config.toml` if `path` is `None`
    ///
    /// An explicit path must exist.
    pub fn load_from(path: Option<&Path>) -> Result<Self, config::ConfigError> {
        let file = match path {
            Some(path) => config::File::from(path).required(true),
            None => config::File::with_name("config").required(false),
        };

        let config = config::Config::builder()
            .add_source(file)
            // e.g. WEATHERFAN_SMTP__HOST, WEATHERFAN_WEATHER__ORDER=visual_crossing,weatherapi
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("weather.order")
                    .try_parsing(true),
            )
            .build()?;

        let app: Self = config.try_deserialize()?;
        app.validate()?;
        Ok(app)
    }

    /// Reject settings that cannot work and warn about risky ones
    pub fn validate(&self) -> Result<(), config::ConfigError> {
        for (name, expr) in [
            ("scheduler.hourly_cron", &self.scheduler.hourly_cron),
            ("scheduler.daily_cron", &self.scheduler.daily_cron),
        ] {
            expr.parse::<cron::Schedule>().map_err(|e| {
                config::ConfigError::Message(format!("{name}: invalid cron '{expr}': {e}"))
            })?;
        }

        if self.database.max_connections == 0 {
            return Err(config::ConfigError::Message(
                "database.max_connections must be at least 1".to_string(),
            ));
        }

        if self.metrics.enabled
            && self.metrics.listen.parse::<std::net::SocketAddr>().is_err()
        {
            return Err(config::ConfigError::Message(format!(
                "metrics.listen: invalid socket address '{}'",
                self.metrics.listen
            )));
        }

        if self.environment == Environment::Production {
            if !self.smtp.starttls {
                warn!("SMTP STARTTLS disabled in production");
            }
            if self.http.base_url.starts_with("http://localhost") {
                warn!(base_url = %self.http.base_url, "Links point at localhost in production");
            }
        }
        Ok(())
    }
}
