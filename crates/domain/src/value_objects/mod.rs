//! Value Objects - Immutable, identity-less domain primitives

mod city;
mod email_address;
mod frequency;
mod subscription_id;
mod weather;

pub use city::City;
pub use email_address::EmailAddress;
pub use frequency::Frequency;
pub use subscription_id::SubscriptionId;
pub use weather::{DayWeatherSnapshot, ForecastSlot, SlotFill, WeatherSnapshot};
