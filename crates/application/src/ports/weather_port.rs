//! Weather service port

use async_trait::async_trait;
use domain::{City, DayWeatherSnapshot, WeatherSnapshot};
#[cfg(test)]
use mockall::automock;

use crate::error::ApplicationError;

/// Port for weather lookups by city
#[cfg_attr(test, automock)]
#[async_trait]
pub trait WeatherPort: Send + Sync {
    /// Current conditions
    async fn get_current_weather(&self, city: &City) -> Result<WeatherSnapshot, ApplicationError>;

    /// Six-slot outlook for today
    async fn get_day_weather(&self, city: &City) -> Result<DayWeatherSnapshot, ApplicationError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn _assert_object_safe(_: &dyn WeatherPort) {}

    #[test]
    fn trait_is_send_sync() {
        fn assert_send_sync<T: Send + Sync + ?Sized>() {}
        assert_send_sync::<dyn WeatherPort>();
    }
}
