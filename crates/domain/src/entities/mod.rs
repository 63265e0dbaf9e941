//! Domain entities - Objects with identity and lifecycle

mod subscription;

pub use subscription::{Subscription, SubscriptionToken};
