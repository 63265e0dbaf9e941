//! Port definitions for application layer
//!
//! Ports are interfaces that define how the application interacts with
//! external systems. Adapters in the infrastructure layer implement these ports.

mod cache_port;
mod clock_port;
mod email_port;
mod notification_port;
mod queue_port;
mod subscription_store;
mod weather_port;

pub use cache_port::{CacheError, CachePort, CacheStats, ttl};
pub use clock_port::{ClockPort, ManualClock, SystemClock};
#[cfg(test)]
pub use email_port::MockEmailSenderPort;
pub use email_port::{EmailSenderPort, OutgoingEmail};
#[cfg(test)]
pub use notification_port::MockNotificationPort;
pub use notification_port::NotificationPort;
#[cfg(test)]
pub use queue_port::{MockQueueConsumerPort, MockQueuePublisherPort};
pub use queue_port::{Delivery, QueueConsumerPort, QueuePublisherPort, QueueStats};
#[cfg(test)]
pub use subscription_store::MockSubscriptionStorePort;
pub use subscription_store::SubscriptionStorePort;
#[cfg(test)]
pub use weather_port::MockWeatherPort;
pub use weather_port::WeatherPort;
