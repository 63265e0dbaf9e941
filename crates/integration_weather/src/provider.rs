//! Provider contract and shared HTTP configuration

use std::time::Duration;

use async_trait::async_trait;
use domain::{DayWeatherSnapshot, WeatherSnapshot};
#[cfg(test)]
use mockall::automock;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::WeatherError;

/// A single upstream weather integration
#[cfg_attr(test, automock)]
#[async_trait]
pub trait WeatherProvider: Send + Sync {
    /// Short identifier used in logs, e.g. `weatherapi`
    fn name(&self) -> &'static str;

    /// Current conditions for a city
    async fn get_current_weather(&self, city: &str) -> Result<WeatherSnapshot, WeatherError>;

    /// Six-slot outlook for today
    async fn get_day_weather(&self, city: &str) -> Result<DayWeatherSnapshot, WeatherError>;
}

/// Connection settings for one provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// API key; a provider without one is left out of the chain
    #[serde(default)]
    pub api_key: String,

    /// Base URL, overridable for tests and proxies
    pub base_url: String,

    /// Request timeout in seconds (default: 10)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

const fn default_timeout() -> u64 {
    10
}

impl ProviderConfig {
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: base_url.into(),
            timeout_secs: default_timeout(),
        }
    }

    /// Whether an API key was supplied
    pub fn is_enabled(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    pub(crate) fn base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    pub(crate) fn build_client(&self) -> Result<Client, WeatherError> {
        Client::builder()
            .timeout(Duration::from_secs(self.timeout_secs))
            .build()
            .map_err(|e| WeatherError::Configuration(e.to_string()))
    }
}
