//! Notification jobs and their queue wire format
//!
//! Jobs are plain JSON documents, one queue per kind. They carry no
//! idempotency key, so a redelivered job produces a second email.

use domain::{City, DayWeatherSnapshot, EmailAddress, Subscription, WeatherSnapshot};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

/// Queue names, one per job kind
pub mod queues {
    pub const CONFIRMATION: &str = "email.confirmation";
    pub const DAILY_FORECAST: &str = "email.daily_forecast";
    pub const HOURLY_FORECAST: &str = "email.hourly_forecast";

    /// Every queue the consumer services
    pub const ALL: [&str; 3] = [CONFIRMATION, DAILY_FORECAST, HOURLY_FORECAST];
}

/// Ask a new subscriber to confirm
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfirmationJob {
    pub email: EmailAddress,
    pub confirmation_link: String,
}

/// Who a forecast is for
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastRecipient {
    pub email: EmailAddress,
    pub city: City,
}

impl From<&Subscription> for ForecastRecipient {
    fn from(sub: &Subscription) -> Self {
        Self {
            email: sub.email.clone(),
            city: sub.city.clone(),
        }
    }
}

/// A forecast email for one subscriber
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastEmailJob<W> {
    pub subscription: ForecastRecipient,
    pub weather: W,
    pub date: String,
    pub unsubscribe_link: String,
}

pub type HourlyForecastJob = ForecastEmailJob<WeatherSnapshot>;
pub type DailyForecastJob = ForecastEmailJob<DayWeatherSnapshot>;

/// Weather resolved for one city in one run
#[derive(Debug, Clone, PartialEq)]
pub enum Forecast {
    Current(WeatherSnapshot),
    Day(DayWeatherSnapshot),
}

/// A forecast job of either cadence
#[derive(Debug, Clone, PartialEq)]
pub enum ForecastJob {
    Hourly(HourlyForecastJob),
    Daily(DailyForecastJob),
}

impl ForecastJob {
    /// Build the job for one subscriber from the city's forecast
    pub fn new(
        recipient: ForecastRecipient,
        forecast: &Forecast,
        date: impl Into<String>,
        unsubscribe_link: impl Into<String>,
    ) -> Self {
        let date = date.into();
        let unsubscribe_link = unsubscribe_link.into();
        match forecast {
            Forecast::Current(weather) => Self::Hourly(ForecastEmailJob {
                subscription: recipient,
                weather: weather.clone(),
                date,
                unsubscribe_link,
            }),
            Forecast::Day(weather) => Self::Daily(ForecastEmailJob {
                subscription: recipient,
                weather: weather.clone(),
                date,
                unsubscribe_link,
            }),
        }
    }

    /// Queue this job is published to
    pub const fn queue(&self) -> &'static str {
        match self {
            Self::Hourly(_) => queues::HOURLY_FORECAST,
            Self::Daily(_) => queues::DAILY_FORECAST,
        }
    }

    pub const fn recipient(&self) -> &ForecastRecipient {
        match self {
            Self::Hourly(job) => &job.subscription,
            Self::Daily(job) => &job.subscription,
        }
    }

    /// JSON payload for the broker
    pub fn to_payload(&self) -> serde_json::Result<Vec<u8>> {
        match self {
            Self::Hourly(job) => serde_json::to_vec(job),
            Self::Daily(job) => serde_json::to_vec(job),
        }
    }
}

/// Any job the consumer can pull off a queue
#[derive(Debug, Clone, PartialEq)]
pub enum NotificationJob {
    Confirmation(ConfirmationJob),
    Forecast(ForecastJob),
}

/// Why a payload could not be turned into a job
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("unknown queue: {0}")]
    UnknownQueue(String),
    #[error("malformed payload: {0}")]
    Malformed(#[from] serde_json::Error),
}

impl NotificationJob {
    /// Decode a payload according to the queue it arrived on
    pub fn decode(queue: &str, payload: &[u8]) -> Result<Self, DecodeError> {
        fn parse<T: DeserializeOwned>(payload: &[u8]) -> Result<T, DecodeError> {
            Ok(serde_json::from_slice(payload)?)
        }

        match queue {
            queues::CONFIRMATION => parse(payload).map(Self::Confirmation),
            queues::DAILY_FORECAST => parse(payload).map(|j| Self::Forecast(ForecastJob::Daily(j))),
            queues::HOURLY_FORECAST => {
                parse(payload).map(|j| Self::Forecast(ForecastJob::Hourly(j)))
            },
            other => Err(DecodeError::UnknownQueue(other.to_string())),
        }
    }
}
