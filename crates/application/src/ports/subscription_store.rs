//! Subscription store port

use async_trait::async_trait;
use domain::{Frequency, Subscription, SubscriptionToken};
#[cfg(test)]
use mockall::automock;

use crate::error::ApplicationError;

/// Persistence for subscriptions
///
/// The store enforces uniqueness of (email, city, frequency).
#[cfg_attr(test, automock)]
#[async_trait]
pub trait SubscriptionStorePort: Send + Sync {
    /// Insert a new subscription
    ///
    /// Returns `ApplicationError::AlreadyExists` on a duplicate triple.
    async fn create(&self, subscription: &Subscription) -> Result<(), ApplicationError>;

    async fn find_by_token(
        &self,
        token: &SubscriptionToken,
    ) -> Result<Option<Subscription>, ApplicationError>;

    /// Mark the subscription confirmed and return it
    async fn confirm(&self, token: &SubscriptionToken) -> Result<Subscription, ApplicationError>;

    /// Delete the subscription
    async fn unsubscribe(&self, token: &SubscriptionToken) -> Result<(), ApplicationError>;

    /// All confirmed subscriptions for a cadence
    async fn get_confirmed_by_frequency(
        &self,
        frequency: Frequency,
    ) -> Result<Vec<Subscription>, ApplicationError>;
}
