//! Subscription lifecycle: subscribe, confirm, unsubscribe

use std::sync::Arc;

use domain::{City, EmailAddress, Frequency, Subscription, SubscriptionToken};
use tracing::{error, info, instrument, warn};

use crate::{
    error::ApplicationError,
    jobs::ConfirmationJob,
    ports::{ClockPort, NotificationPort, SubscriptionStorePort},
};

/// Creates subscriptions and sends the confirmation request
pub struct SubscriptionService {
    store: Arc<dyn SubscriptionStorePort>,
    notifier: Arc<dyn NotificationPort>,
    clock: Arc<dyn ClockPort>,
    base_url: String,
}

impl std::fmt::Debug for SubscriptionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionService")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl SubscriptionService {
    #[must_use]
    pub fn new(
        store: Arc<dyn SubscriptionStorePort>,
        notifier: Arc<dyn NotificationPort>,
        clock: Arc<dyn ClockPort>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            store,
            notifier,
            clock,
            base_url: base_url.into(),
        }
    }

    /// Store an unconfirmed subscription and request confirmation
    ///
    /// # Errors
    ///
    /// Validation errors for the email or city, `AlreadyExists` for a
    /// duplicate, or the notifier's error if the confirmation could not be
    /// handed off. In the last case the subscription is removed again so
    /// the same triple can be retried; a failed removal is returned instead.
    #[instrument(skip(self, email, city), fields(frequency = %frequency))]
    pub async fn subscribe(
        &self,
        email: &str,
        city: &str,
        frequency: Frequency,
    ) -> Result<Subscription, ApplicationError> {
        let email = EmailAddress::new(email)?;
        let city = City::new(city)?;
        let subscription = Subscription::new(email, city, frequency, self.clock.now());

        self.store.create(&subscription).await?;

        let job = ConfirmationJob {
            email: subscription.email.clone(),
            confirmation_link: subscription.confirmation_link(&self.base_url),
        };
        if let Err(e) = self.notifier.send_confirmation(&job).await {
            warn!(email = %subscription.email, error = %e, "Failed to send confirmation");
            self.store
                .unsubscribe(&subscription.token)
                .await
                .inspect_err(|rollback| {
                    error!(
                        email = %subscription.email,
                        error = %rollback,
                        "Failed to remove unconfirmed subscription"
                    );
                })?;
            return Err(e);
        }

        info!(
            email = %subscription.email,
            city = %subscription.city,
            "Subscription created, confirmation sent"
        );
        Ok(subscription)
    }

    /// Confirm by token
    #[instrument(skip(self))]
    pub async fn confirm(&self, token: &str) -> Result<Subscription, ApplicationError> {
        let subscription = self
            .store
            .confirm(&SubscriptionToken::from_raw(token))
            .await?;
        info!(email = %subscription.email, city = %subscription.city, "Subscription confirmed");
        Ok(subscription)
    }

    /// Remove by token
    #[instrument(skip(self))]
    pub async fn unsubscribe(&self, token: &str) -> Result<(), ApplicationError> {
        self.store
            .unsubscribe(&SubscriptionToken::from_raw(token))
            .await?;
        info!("Subscription removed");
        Ok(())
    }
}
