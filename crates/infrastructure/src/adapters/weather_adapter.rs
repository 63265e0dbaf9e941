//! Weather adapter - Implements `WeatherPort` on top of a provider chain

use std::sync::Arc;

use application::{error::ApplicationError, ports::WeatherPort};
use async_trait::async_trait;
use domain::{City, DayWeatherSnapshot, WeatherSnapshot};
use integration_weather::{ProviderChain, WeatherError, WeatherProvider};
use tracing::{debug, instrument};

/// Exposes any [`WeatherProvider`], usually a [`ProviderChain`], as a `WeatherPort`
pub struct WeatherAdapter {
    provider: Arc<dyn WeatherProvider>,
}

impl std::fmt::Debug for WeatherAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeatherAdapter")
            .field("provider", &self.provider.name())
            .finish()
    }
}

impl WeatherAdapter {
    #[must_use]
    pub fn new(provider: Arc<dyn WeatherProvider>) -> Self {
        Self { provider }
    }

    #[must_use]
    pub fn from_chain(chain: ProviderChain) -> Self {
        Self::new(Arc::new(chain))
    }

    fn map_error(err: WeatherError) -> ApplicationError {
        match err {
            WeatherError::CityNotFound { city, .. } => ApplicationError::CityNotFound(city),
            WeatherError::EmptyChain | WeatherError::Configuration(_) => {
                ApplicationError::Configuration(err.to_string())
            },
            WeatherError::UpstreamData { .. } | WeatherError::Transport { .. } => {
                ApplicationError::ExternalService(err.to_string())
            },
        }
    }
}

#[async_trait]
impl WeatherPort for WeatherAdapter {
    #[instrument(skip(self), fields(provider = self.provider.name()))]
    async fn get_current_weather(&self, city: &City) -> Result<WeatherSnapshot, ApplicationError> {
        let snapshot = self
            .provider
            .get_current_weather(city.as_str())
            .await
            .map_err(Self::map_error)?;
        debug!(city = %city, temperature = snapshot.temperature, "Current weather fetched");
        Ok(snapshot)
    }

    #[instrument(skip(self), fields(provider = self.provider.name()))]
    async fn get_day_weather(&self, city: &City) -> Result<DayWeatherSnapshot, ApplicationError> {
        let day = self
            .provider
            .get_day_weather(city.as_str())
            .await
            .map_err(Self::map_error)?;
        debug!(city = %city, "Day weather fetched");
        Ok(day)
    }
}
