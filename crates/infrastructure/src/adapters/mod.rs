//! Infrastructure adapters
//!
//! Adapters connect application ports to concrete implementations.

mod cached_weather_adapter;
mod email_notifier;
mod queue_notifier;
mod smtp_sender;
mod weather_adapter;

pub use cached_weather_adapter::CachedWeatherAdapter;
pub use email_notifier::{EmailSubjects, TemplatedEmailNotifier};
pub use queue_notifier::QueueNotifier;
pub use smtp_sender::{EmailError, SmtpEmailSender};
pub use weather_adapter::WeatherAdapter;
