//! Ordered failover across providers

use std::sync::Arc;

use async_trait::async_trait;
use domain::{DayWeatherSnapshot, WeatherSnapshot};
use futures::future::BoxFuture;
use tracing::{debug, warn};

use crate::{error::WeatherError, provider::WeatherProvider};

/// An immutable, non-empty list of providers tried in order
///
/// Each request goes to the first provider; any failure (including city not
/// found, since another geocoder may know the name) hands the same request to
/// the next one. The last provider's error is returned when all fail. Every
/// provider is called at most once per request.
#[derive(Clone)]
pub struct ProviderChain {
    providers: Vec<Arc<dyn WeatherProvider>>,
}

impl std::fmt::Debug for ProviderChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderChain")
            .field("providers", &self.names())
            .finish()
    }
}

impl ProviderChain {
    /// Build a chain from providers in priority order
    ///
    /// # Errors
    ///
    /// Returns `WeatherError::EmptyChain` if `providers` is empty.
    pub fn new(providers: Vec<Arc<dyn WeatherProvider>>) -> Result<Self, WeatherError> {
        if providers.is_empty() {
            return Err(WeatherError::EmptyChain);
        }
        Ok(Self { providers })
    }

    /// Provider names in the order they are tried
    pub fn names(&self) -> Vec<&'static str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    async fn first_success<'a, T, F>(
        &'a self,
        operation: &'static str,
        city: &'a str,
        call: F,
    ) -> Result<T, WeatherError>
    where
        F: Fn(&'a dyn WeatherProvider, &'a str) -> BoxFuture<'a, Result<T, WeatherError>>,
    {
        let mut last_error = WeatherError::EmptyChain;
        let mut remaining = self.providers.iter().peekable();

        while let Some(provider) = remaining.next() {
            match call(provider.as_ref(), city).await {
                Ok(value) => {
                    debug!(provider = provider.name(), operation, city, "Weather resolved");
                    return Ok(value);
                },
                Err(e) => {
                    match remaining.peek() {
                        Some(next) => warn!(
                            provider = provider.name(),
                            next = next.name(),
                            operation,
                            city,
                            error = %e,
                            "Weather provider failed, trying next"
                        ),
                        None => warn!(
                            provider = provider.name(),
                            operation,
                            city,
                            error = %e,
                            "Last weather provider failed"
                        ),
                    }
                    last_error = e;
                },
            }
        }

        Err(last_error)
    }
}

#[async_trait]
impl WeatherProvider for ProviderChain {
    fn name(&self) -> &'static str {
        "chain"
    }

    async fn get_current_weather(&self, city: &str) -> Result<WeatherSnapshot, WeatherError> {
        self.first_success("current", city, |p, c| p.get_current_weather(c))
            .await
    }

    async fn get_day_weather(&self, city: &str) -> Result<DayWeatherSnapshot, WeatherError> {
        self.first_success("day", city, |p, c| p.get_day_weather(c))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::MockWeatherProvider;

    fn failing(name: &'static str, err: fn() -> WeatherError) -> MockWeatherProvider {
        let mut mock = MockWeatherProvider::new();
        mock.expect_name().return_const(name);
        mock.expect_get_current_weather()
            .times(1)
            .returning(move |_| Err(err()));
        mock
    }

    fn city_not_found() -> WeatherError {
        WeatherError::CityNotFound {
            provider: "a",
            city: "Kyiv".into(),
        }
    }

    fn upstream() -> WeatherError {
        WeatherError::UpstreamData {
            provider: "b",
            message: "HTTP 500".into(),
        }
    }

    #[test]
    fn empty_chain_is_rejected() {
        assert!(matches!(
            ProviderChain::new(Vec::new()),
            Err(WeatherError::EmptyChain)
        ));
    }

    #[tokio::test]
    async fn falls_through_to_third_provider() {
        let a = failing("a", city_not_found);
        let b = failing("b", upstream);

        let mut c = MockWeatherProvider::new();
        c.expect_name().return_const("c");
        c.expect_get_current_weather()
            .times(1)
            .returning(|_| Ok(WeatherSnapshot::new(22.0, 40.0, "Sunny")));

        let chain = ProviderChain::new(vec![Arc::new(a), Arc::new(b), Arc::new(c)]).unwrap();
        let result = chain.get_current_weather("Kyiv").await.unwrap();

        assert_eq!(result.description, "Sunny");
    }

    #[tokio::test]
    async fn stops_at_first_success() {
        let mut a = MockWeatherProvider::new();
        a.expect_name().return_const("a");
        a.expect_get_current_weather()
            .times(1)
            .returning(|_| Ok(WeatherSnapshot::new(1.0, 2.0, "Fog")));

        let mut b = MockWeatherProvider::new();
        b.expect_name().return_const("b");
        b.expect_get_current_weather().never();

        let chain = ProviderChain::new(vec![Arc::new(a), Arc::new(b)]).unwrap();
        assert_eq!(chain.get_current_weather("Kyiv").await.unwrap().description, "Fog");
    }

    #[tokio::test]
    async fn returns_last_error_when_all_fail() {
        let chain = ProviderChain::new(vec![
            Arc::new(failing("a", city_not_found)),
            Arc::new(failing("b", upstream)),
        ])
        .unwrap();

        let err = chain.get_current_weather("Kyiv").await.unwrap_err();
        assert!(matches!(err, WeatherError::UpstreamData { provider: "b", .. }));
    }

    #[tokio::test]
    async fn day_requests_use_the_same_order() {
        let mut a = MockWeatherProvider::new();
        a.expect_name().return_const("a");
        a.expect_get_day_weather()
            .times(1)
            .returning(|_| Err(city_not_found()));

        let mut b = MockWeatherProvider::new();
        b.expect_name().return_const("b");
        b.expect_get_day_weather()
            .withf(|city| city == "Lviv")
            .times(1)
            .returning(|_| Ok(DayWeatherSnapshot::default()));

        let chain = ProviderChain::new(vec![Arc::new(a), Arc::new(b)]).unwrap();
        assert!(chain.get_day_weather("Lviv").await.is_ok());
    }

    #[test]
    fn names_preserve_order() {
        let mut a = MockWeatherProvider::new();
        a.expect_name().return_const("weatherapi");
        let mut b = MockWeatherProvider::new();
        b.expect_name().return_const("visualcrossing");

        let chain = ProviderChain::new(vec![Arc::new(a), Arc::new(b)]).unwrap();
        assert_eq!(chain.names(), vec!["weatherapi", "visualcrossing"]);
    }
}
