//! Upstream weather provider configuration.

use std::sync::Arc;

use integration_weather::{
    ProviderChain, ProviderConfig, VisualCrossingClient, WeatherApiClient, WeatherError,
    WeatherProvider, visual_crossing, weatherapi,
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Settings for one provider
///
/// A provider with no API key is left out of the chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSettings {
    #[serde(default, skip_serializing)]
    pub api_key: Option<SecretString>,

    #[serde(default)]
    pub base_url: Option<String>,

    /// Request timeout in seconds (default: 10)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

const fn default_timeout_secs() -> u64 {
    10
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl ProviderSettings {
    /// Provider connection settings, or `None` without a usable key
    fn to_provider_config(&self, default_base_url: &str) -> Option<ProviderConfig> {
        let key = self
            .api_key
            .as_ref()
            .map(|k| k.expose_secret().trim().to_string())
            .filter(|k| !k.is_empty())?;
        Some(ProviderConfig {
            api_key: key,
            base_url: self
                .base_url
                .clone()
                .unwrap_or_else(|| default_base_url.to_string()),
            timeout_secs: self.timeout_secs,
        })
    }
}

/// Provider chain configuration
///
/// `order` lists provider names in fallback order. Unknown names are
/// ignored with a warning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    #[serde(default = "default_order")]
    pub order: Vec<String>,

    #[serde(default)]
    pub weatherapi: ProviderSettings,

    #[serde(default)]
    pub visual_crossing: ProviderSettings,
}

fn default_order() -> Vec<String> {
    vec!["weatherapi".to_string(), "visual_crossing".to_string()]
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            order: default_order(),
            weatherapi: ProviderSettings::default(),
            visual_crossing: ProviderSettings::default(),
        }
    }
}

impl WeatherConfig {
    /// Build the fallback chain from the configured providers
    ///
    /// # Errors
    ///
    /// `WeatherError::EmptyChain` if no provider has a key, or
    /// `WeatherError::Configuration` if an HTTP client cannot be built.
    pub fn build_chain(&self) -> Result<ProviderChain, WeatherError> {
        let mut providers: Vec<Arc<dyn WeatherProvider>> = Vec::new();

        for name in &self.order {
            let provider: Arc<dyn WeatherProvider> = match name.as_str() {
                "weatherapi" => {
                    let Some(config) =
                        self.weatherapi.to_provider_config(weatherapi::DEFAULT_BASE_URL)
                    else {
                        warn!(provider = "weatherapi", "No API key, provider disabled");
                        continue;
                    };
                    Arc::new(WeatherApiClient::new(config)?)
                },
                "visual_crossing" => {
                    let Some(config) = self
                        .visual_crossing
                        .to_provider_config(visual_crossing::DEFAULT_BASE_URL)
                    else {
                        warn!(provider = "visual_crossing", "No API key, provider disabled");
                        continue;
                    };
                    Arc::new(VisualCrossingClient::new(config)?)
                },
                other => {
                    warn!(provider = %other, "Unknown weather provider in order, ignoring");
                    continue;
                },
            };
            providers.push(provider);
        }

        let chain = ProviderChain::new(providers)?;
        info!(providers = ?chain.names(), "Weather provider chain built");
        Ok(chain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keyed(key: &str) -> ProviderSettings {
        ProviderSettings {
            api_key: Some(SecretString::from(key.to_string())),
            ..ProviderSettings::default()
        }
    }

    #[test]
    fn no_keys_is_an_empty_chain() {
        let result = WeatherConfig::default().build_chain();
        assert!(matches!(result, Err(WeatherError::EmptyChain)));
    }

    #[test]
    fn blank_key_disables_provider() {
        let config = WeatherConfig {
            weatherapi: keyed("   "),
            visual_crossing: keyed("vc-key"),
            ..WeatherConfig::default()
        };
        let chain = config.build_chain().unwrap();
        assert_eq!(chain.names(), vec!["visualcrossing"]);
    }

    #[test]
    fn order_is_respected() {
        let config = WeatherConfig {
            order: vec!["visual_crossing".into(), "nope".into(), "weatherapi".into()],
            weatherapi: keyed("wa-key"),
            visual_crossing: keyed("vc-key"),
        };
        let chain = config.build_chain().unwrap();
        assert_eq!(chain.names(), vec!["visualcrossing", "weatherapi"]);
    }

    #[test]
    fn default_base_url_is_used() {
        let config = keyed("k").to_provider_config("https://example.test").unwrap();
        assert_eq!(config.base_url, "https://example.test");
        assert_eq!(config.api_key, "k");
    }
}
