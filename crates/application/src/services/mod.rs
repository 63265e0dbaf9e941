//! Application services - Use case implementations

mod forecast_dispatcher;
mod notification_consumer;
mod subscription_service;

pub use forecast_dispatcher::{DispatchReport, DispatcherConfig, ForecastDispatcher};
pub use notification_consumer::{ConsumerConfig, DeliveryOutcome, NotificationConsumer};
pub use subscription_service::SubscriptionService;
