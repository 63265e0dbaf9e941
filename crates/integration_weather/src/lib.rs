//! Upstream weather providers
//!
//! Two HTTP integrations map their own wire formats into the domain weather
//! model:
//!
//! - [`WeatherApiClient`] for <https://www.weatherapi.com>
//! - [`VisualCrossingClient`] for the Visual Crossing timeline API
//!
//! [`ProviderChain`] tries an ordered list of providers and falls back to the
//! next one on any failure, including "city not found".

pub mod chain;
pub mod error;
pub mod provider;
pub mod visual_crossing;
pub mod weatherapi;

pub use chain::ProviderChain;
pub use error::WeatherError;
pub use provider::{ProviderConfig, WeatherProvider};
pub use visual_crossing::VisualCrossingClient;
pub use weatherapi::WeatherApiClient;
