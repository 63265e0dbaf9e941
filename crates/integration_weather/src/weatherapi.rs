//! WeatherAPI.com client
//!
//! Uses `current.json` for current conditions and `forecast.json?days=1` for
//! the hourly series of today.

use async_trait::async_trait;
use chrono::{NaiveDateTime, Timelike};
use domain::{DayWeatherSnapshot, WeatherSnapshot};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use crate::{
    error::WeatherError,
    provider::{ProviderConfig, WeatherProvider},
};

const NAME: &str = "weatherapi";

/// Upstream error code for "No location found matching parameter 'q'"
const LOCATION_NOT_FOUND_CODE: i64 = 1006;

/// Default base URL
pub const DEFAULT_BASE_URL: &str = "https://api.weatherapi.com/v1";

#[derive(Debug, Deserialize)]
struct Condition {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct CurrentResponse {
    current: CurrentData,
}

#[derive(Debug, Deserialize)]
struct CurrentData {
    temp_c: f32,
    humidity: f32,
    condition: Condition,
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    forecast: ForecastData,
}

#[derive(Debug, Deserialize)]
struct ForecastData {
    #[serde(default)]
    forecastday: Vec<ForecastDay>,
}

#[derive(Debug, Deserialize)]
struct ForecastDay {
    #[serde(default)]
    hour: Vec<HourData>,
}

#[derive(Debug, Deserialize)]
struct HourData {
    /// Local time, e.g. `2025-05-17 07:00`
    time: String,
    temp_c: f32,
    humidity: f32,
    condition: Condition,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    code: i64,
    #[serde(default)]
    message: String,
}

/// WeatherAPI.com HTTP client
pub struct WeatherApiClient {
    client: Client,
    config: ProviderConfig,
}

impl std::fmt::Debug for WeatherApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeatherApiClient")
            .field("base_url", &self.config.base_url)
            .field("timeout_secs", &self.config.timeout_secs)
            .finish_non_exhaustive()
    }
}

impl WeatherApiClient {
    /// Create a new client
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be initialized.
    pub fn new(config: ProviderConfig) -> Result<Self, WeatherError> {
        let client = config.build_client()?;
        Ok(Self { client, config })
    }

    async fn fetch(
        &self,
        endpoint: &str,
        city: &str,
        extra: &[(&str, &str)],
    ) -> Result<String, WeatherError> {
        let url = format!("{}/{endpoint}", self.config.base_url());
        debug!(url = %url, city = %city, "Requesting weatherapi");

        let response = self
            .client
            .get(&url)
            .query(&[("key", self.config.api_key.as_str()), ("q", city)])
            .query(extra)
            .send()
            .await
            .map_err(|e| WeatherError::transport(NAME, &e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| WeatherError::transport(NAME, &e))?;

        if status == StatusCode::OK {
            Ok(body)
        } else {
            Err(Self::classify_error(status, &body, city))
        }
    }

    fn classify_error(status: StatusCode, body: &str, city: &str) -> WeatherError {
        match serde_json::from_str::<ErrorResponse>(body) {
            Ok(payload)
                if status == StatusCode::BAD_REQUEST
                    && payload.error.code == LOCATION_NOT_FOUND_CODE =>
            {
                WeatherError::CityNotFound {
                    provider: NAME,
                    city: city.to_string(),
                }
            },
            Ok(payload) => WeatherError::upstream(
                NAME,
                format!(
                    "HTTP {status}: code {} {}",
                    payload.error.code, payload.error.message
                ),
            ),
            Err(_) => WeatherError::upstream(NAME, format!("HTTP {status}")),
        }
    }

    fn decode<T: serde::de::DeserializeOwned>(body: &str) -> Result<T, WeatherError> {
        serde_json::from_str(body)
            .map_err(|e| WeatherError::upstream(NAME, format!("decode: {e}")))
    }

    fn map_day(city: &str, response: ForecastResponse) -> DayWeatherSnapshot {
        let hours = response
            .forecast
            .forecastday
            .into_iter()
            .next()
            .map(|day| day.hour)
            .unwrap_or_default();

        let fill = DayWeatherSnapshot::from_hourly(hours.into_iter().filter_map(|h| {
            let hour = NaiveDateTime::parse_from_str(&h.time, "%Y-%m-%d %H:%M")
                .ok()?
                .hour();
            Some((
                hour,
                WeatherSnapshot::new(h.temp_c, h.humidity, h.condition.text),
            ))
        }));

        if !fill.is_complete() {
            warn!(
                provider = NAME,
                city = %city,
                missing = ?fill.missing,
                "Day forecast is missing hours, using zero snapshots"
            );
        }

        fill.day
    }
}

#[async_trait]
impl WeatherProvider for WeatherApiClient {
    fn name(&self) -> &'static str {
        NAME
    }

    #[instrument(skip(self), fields(provider = NAME))]
    async fn get_current_weather(&self, city: &str) -> Result<WeatherSnapshot, WeatherError> {
        let body = self.fetch("current.json", city, &[]).await?;
        let response: CurrentResponse = Self::decode(&body)?;

        Ok(WeatherSnapshot::new(
            response.current.temp_c,
            response.current.humidity,
            response.current.condition.text,
        ))
    }

    #[instrument(skip(self), fields(provider = NAME))]
    async fn get_day_weather(&self, city: &str) -> Result<DayWeatherSnapshot, WeatherError> {
        let body = self.fetch("forecast.json", city, &[("days", "1")]).await?;
        let response: ForecastResponse = Self::decode(&body)?;
        Ok(Self::map_day(city, response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_1006_with_400_is_city_not_found() {
        let body = r#"{"error":{"code":1006,"message":"No matching location found."}}"#;
        let err = WeatherApiClient::classify_error(StatusCode::BAD_REQUEST, body, "Atlantis");
        assert!(err.is_city_not_found());
    }

    #[test]
    fn code_1006_with_other_status_is_upstream_error() {
        let body = r#"{"error":{"code":1006,"message":"No matching location found."}}"#;
        let err = WeatherApiClient::classify_error(StatusCode::FORBIDDEN, body, "Atlantis");
        assert!(matches!(err, WeatherError::UpstreamData { .. }));
    }

    #[test]
    fn other_codes_are_upstream_errors() {
        let body = r#"{"error":{"code":2006,"message":"API key is invalid."}}"#;
        let err = WeatherApiClient::classify_error(StatusCode::UNAUTHORIZED, body, "Kyiv");
        assert!(err.to_string().contains("2006"));
    }

    #[test]
    fn unparseable_error_body_is_upstream_error() {
        let err = WeatherApiClient::classify_error(StatusCode::BAD_GATEWAY, "<html>", "Kyiv");
        assert!(matches!(err, WeatherError::UpstreamData { .. }));
    }

    #[test]
    fn day_mapping_picks_target_hours() {
        let response: ForecastResponse = serde_json::from_value(serde_json::json!({
            "forecast": {"forecastday": [{"hour": [
                {"time": "2025-05-17 06:00", "temp_c": 6.0, "humidity": 80.0, "condition": {"text": "Mist"}},
                {"time": "2025-05-17 07:00", "temp_c": 7.0, "humidity": 70.0, "condition": {"text": "Sunny"}},
                {"time": "2025-05-17 22:00", "temp_c": 12.0, "humidity": 60.0, "condition": {"text": "Clear"}}
            ]}]}
        }))
        .unwrap();

        let day = WeatherApiClient::map_day("Kyiv", response);

        assert_eq!(day.seven_am.description, "Sunny");
        assert_eq!(day.ten_pm.description, "Clear");
        assert!(day.one_pm.is_zero());
    }

    #[test]
    fn day_mapping_without_forecast_days_is_all_zero() {
        let response: ForecastResponse =
            serde_json::from_value(serde_json::json!({"forecast": {"forecastday": []}})).unwrap();

        let day = WeatherApiClient::map_day("Kyiv", response);
        assert!(day.slots().all(|(_, s)| s.is_zero()));
    }
}
