//! Visual Crossing timeline API client

use async_trait::async_trait;
use chrono::{NaiveTime, Timelike};
use domain::{DayWeatherSnapshot, WeatherSnapshot};
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use crate::{
    error::WeatherError,
    provider::{ProviderConfig, WeatherProvider},
};

const NAME: &str = "visualcrossing";

/// Plain-text body returned with HTTP 400 for an unknown location
const CITY_NOT_FOUND_BODY: &str = "Bad API Request:Invalid location parameter value.";

/// Default base URL
pub const DEFAULT_BASE_URL: &str =
    "https://weather.visualcrossing.com/VisualCrossingWebServices/rest/services/timeline";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TimelineResponse {
    current_conditions: Option<Conditions>,
    #[serde(default)]
    days: Vec<TimelineDay>,
}

#[derive(Debug, Deserialize)]
struct TimelineDay {
    #[serde(default)]
    hours: Vec<Conditions>,
}

#[derive(Debug, Deserialize)]
struct Conditions {
    /// `HH:MM:SS` for hourly entries
    #[serde(default)]
    datetime: String,
    #[serde(default)]
    temp: f32,
    #[serde(default)]
    humidity: f32,
    #[serde(default)]
    conditions: String,
}

impl From<Conditions> for WeatherSnapshot {
    fn from(c: Conditions) -> Self {
        Self::new(c.temp, c.humidity, c.conditions)
    }
}

/// Visual Crossing HTTP client
pub struct VisualCrossingClient {
    client: Client,
    config: ProviderConfig,
}

impl std::fmt::Debug for VisualCrossingClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VisualCrossingClient")
            .field("base_url", &self.config.base_url)
            .field("timeout_secs", &self.config.timeout_secs)
            .finish_non_exhaustive()
    }
}

impl VisualCrossingClient {
    /// Create a new client
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be initialized.
    pub fn new(config: ProviderConfig) -> Result<Self, WeatherError> {
        let client = config.build_client()?;
        Ok(Self { client, config })
    }

    /// `{base}/{city}/today?unitGroup=metric&include={include}&key=...`
    ///
    /// The city is a path segment, so it is percent-encoded by `Url`.
    fn timeline_url(&self, city: &str, include: &str) -> Result<Url, WeatherError> {
        let mut url = Url::parse(self.config.base_url())
            .map_err(|e| WeatherError::Configuration(format!("invalid base URL: {e}")))?;

        url.path_segments_mut()
            .map_err(|()| WeatherError::Configuration("base URL cannot have a path".into()))?
            .push(city)
            .push("today");

        url.query_pairs_mut()
            .append_pair("unitGroup", "metric")
            .append_pair("include", include)
            .append_pair("key", &self.config.api_key)
            .append_pair("contentType", "json");

        Ok(url)
    }

    async fn fetch(&self, city: &str, include: &str) -> Result<TimelineResponse, WeatherError> {
        let url = self.timeline_url(city, include)?;
        debug!(city = %city, include = include, "Requesting visual crossing timeline");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| WeatherError::transport(NAME, &e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| WeatherError::transport(NAME, &e))?;

        if status != StatusCode::OK {
            return Err(Self::classify_error(status, &body, city));
        }

        serde_json::from_str(&body)
            .map_err(|e| WeatherError::upstream(NAME, format!("decode: {e}")))
    }

    fn classify_error(status: StatusCode, body: &str, city: &str) -> WeatherError {
        if status == StatusCode::BAD_REQUEST && body.trim() == CITY_NOT_FOUND_BODY {
            WeatherError::CityNotFound {
                provider: NAME,
                city: city.to_string(),
            }
        } else {
            WeatherError::upstream(NAME, format!("HTTP {status}: {}", body.trim()))
        }
    }

    fn map_day(city: &str, response: TimelineResponse) -> DayWeatherSnapshot {
        let hours = response
            .days
            .into_iter()
            .next()
            .map(|day| day.hours)
            .unwrap_or_default();

        let fill = DayWeatherSnapshot::from_hourly(hours.into_iter().filter_map(|h| {
            let hour = NaiveTime::parse_from_str(&h.datetime, "%H:%M:%S").ok()?.hour();
            Some((hour, WeatherSnapshot::from(h)))
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
impl WeatherProvider for VisualCrossingClient {
    fn name(&self) -> &'static str {
        NAME
    }

    #[instrument(skip(self), fields(provider = NAME))]
    async fn get_current_weather(&self, city: &str) -> Result<WeatherSnapshot, WeatherError> {
        let response = self.fetch(city, "current").await?;

        response
            .current_conditions
            .map(WeatherSnapshot::from)
            .ok_or_else(|| WeatherError::upstream(NAME, "response has no currentConditions"))
    }

    #[instrument(skip(self), fields(provider = NAME))]
    async fn get_day_weather(&self, city: &str) -> Result<DayWeatherSnapshot, WeatherError> {
        let response = self.fetch(city, "hours").await?;
        Ok(Self::map_day(city, response))
    }
}
