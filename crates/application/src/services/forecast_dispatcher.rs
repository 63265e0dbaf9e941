//! Forecast fan-out for one cadence
//!
//! A run loads the confirmed subscriptions for a cadence, groups them by city,
//! resolves weather once per city and hands one job per subscriber to the
//! [`NotificationPort`]. Only a failure to load the subscriptions fails the
//! run. A city whose weather cannot be resolved is skipped as a whole, and a
//! subscriber whose notification fails is skipped alone.

use std::{
    collections::BTreeMap,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use domain::{City, Frequency, Subscription};
use futures::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::{
    error::ApplicationError,
    jobs::{Forecast, ForecastJob, ForecastRecipient},
    ports::{ClockPort, NotificationPort, SubscriptionStorePort, WeatherPort},
};

/// Configuration for the dispatcher
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Public base URL used for unsubscribe links
    pub base_url: String,
    /// Cities resolved and notified concurrently within one run
    pub max_concurrent_cities: usize,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            max_concurrent_cities: 4,
        }
    }
}

/// Outcome of one dispatch run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchReport {
    pub frequency: Frequency,
    pub subscriptions: usize,
    pub cities: usize,
    pub cities_failed: usize,
    pub notifications_sent: usize,
    pub notifications_failed: usize,
}

impl DispatchReport {
    const fn new(frequency: Frequency, subscriptions: usize, cities: usize) -> Self {
        Self {
            frequency,
            subscriptions,
            cities,
            cities_failed: 0,
            notifications_sent: 0,
            notifications_failed: 0,
        }
    }
}

#[derive(Debug, Default)]
struct CityOutcome {
    failed: bool,
    sent: usize,
    send_failures: usize,
}

/// Releases the per-cadence running flag on drop
struct RunGuard<'a>(&'a AtomicBool);

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Drives hourly and daily forecast runs
pub struct ForecastDispatcher {
    store: Arc<dyn SubscriptionStorePort>,
    weather: Arc<dyn WeatherPort>,
    notifier: Arc<dyn NotificationPort>,
    clock: Arc<dyn ClockPort>,
    config: DispatcherConfig,
    hourly_running: AtomicBool,
    daily_running: AtomicBool,
}

impl std::fmt::Debug for ForecastDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ForecastDispatcher")
            .field("config", &self.config)
            .field("hourly_running", &self.hourly_running)
            .field("daily_running", &self.daily_running)
            .finish_non_exhaustive()
    }
}

impl ForecastDispatcher {
    #[must_use]
    pub fn new(
        store: Arc<dyn SubscriptionStorePort>,
        weather: Arc<dyn WeatherPort>,
        notifier: Arc<dyn NotificationPort>,
        clock: Arc<dyn ClockPort>,
        config: DispatcherConfig,
    ) -> Self {
        Self {
            store,
            weather,
            notifier,
            clock,
            config,
            hourly_running: AtomicBool::new(false),
            daily_running: AtomicBool::new(false),
        }
    }

    /// Send current conditions to every confirmed hourly subscriber
    pub async fn send_hourly_forecast(
        &self,
        cancel: &CancellationToken,
    ) -> Result<DispatchReport, ApplicationError> {
        self.dispatch(Frequency::Hourly, cancel).await
    }

    /// Send the six-slot day outlook to every confirmed daily subscriber
    pub async fn send_daily_forecast(
        &self,
        cancel: &CancellationToken,
    ) -> Result<DispatchReport, ApplicationError> {
        self.dispatch(Frequency::Daily, cancel).await
    }

    /// Run the fan-out for a cadence
    ///
    /// Returns `ApplicationError::AlreadyRunning` without doing anything if a
    /// run of the same cadence has not finished yet.
    #[instrument(skip(self, cancel), fields(frequency = %frequency))]
    pub async fn dispatch(
        &self,
        frequency: Frequency,
        cancel: &CancellationToken,
    ) -> Result<DispatchReport, ApplicationError> {
        let _guard = self.acquire(frequency)?;

        let subscriptions = self
            .store
            .get_confirmed_by_frequency(frequency)
            .await
            .inspect_err(|e| {
                error!(frequency = %frequency, error = %e, "Failed to load subscriptions");
            })?;

        let total = subscriptions.len();
        let groups = group_by_city(subscriptions);
        let mut report = DispatchReport::new(frequency, total, groups.len());

        if groups.is_empty() {
            debug!(frequency = %frequency, "No confirmed subscriptions");
            return Ok(report);
        }

        let date = self
            .clock
            .now()
            .format(frequency.date_format())
            .to_string();

        let outcomes: Vec<CityOutcome> = stream::iter(groups)
            .map(|(city, subs)| self.dispatch_city(frequency, city, subs, &date, cancel))
            .buffer_unordered(self.config.max_concurrent_cities.max(1))
            .collect()
            .await;

        for outcome in outcomes {
            if outcome.failed {
                report.cities_failed += 1;
            }
            report.notifications_sent += outcome.sent;
            report.notifications_failed += outcome.send_failures;
        }

        metrics::counter!(
            "forecast_notifications_sent_total",
            "frequency" => frequency.as_str()
        )
        .increment(report.notifications_sent as u64);
        metrics::counter!(
            "forecast_notifications_failed_total",
            "frequency" => frequency.as_str()
        )
        .increment(report.notifications_failed as u64);

        info!(
            frequency = %frequency,
            subscriptions = report.subscriptions,
            cities = report.cities,
            cities_failed = report.cities_failed,
            sent = report.notifications_sent,
            failed = report.notifications_failed,
            "Forecast dispatch finished"
        );

        Ok(report)
    }

    fn acquire(&self, frequency: Frequency) -> Result<RunGuard<'_>, ApplicationError> {
        let flag = match frequency {
            Frequency::Hourly => &self.hourly_running,
            Frequency::Daily => &self.daily_running,
        };

        if flag
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!(frequency = %frequency, "Previous dispatch still running, skipping");
            return Err(ApplicationError::AlreadyRunning(frequency.to_string()));
        }

        Ok(RunGuard(flag))
    }

    async fn fetch_forecast(
        &self,
        frequency: Frequency,
        city: &City,
    ) -> Result<Forecast, ApplicationError> {
        match frequency {
            Frequency::Hourly => self
                .weather
                .get_current_weather(city)
                .await
                .map(Forecast::Current),
            Frequency::Daily => self.weather.get_day_weather(city).await.map(Forecast::Day),
        }
    }

    async fn dispatch_city(
        &self,
        frequency: Frequency,
        city: City,
        subscriptions: Vec<Subscription>,
        date: &str,
        cancel: &CancellationToken,
    ) -> CityOutcome {
        let forecast = tokio::select! {
            biased;
            () = cancel.cancelled() => Err(ApplicationError::Cancelled),
            result = self.fetch_forecast(frequency, &city) => result,
        };

        let forecast = match forecast {
            Ok(forecast) => forecast,
            Err(e) => {
                warn!(
                    frequency = %frequency,
                    city = %city,
                    subscribers = subscriptions.len(),
                    error = %e,
                    "Failed to resolve weather, skipping city"
                );
                return CityOutcome {
                    failed: true,
                    ..CityOutcome::default()
                };
            },
        };

        let mut outcome = CityOutcome::default();
        for subscription in &subscriptions {
            let job = ForecastJob::new(
                ForecastRecipient::from(subscription),
                &forecast,
                date,
                subscription.unsubscribe_link(&self.config.base_url),
            );

            match self.notifier.send_forecast(&job).await {
                Ok(()) => outcome.sent += 1,
                Err(e) => {
                    warn!(
                        frequency = %frequency,
                        city = %city,
                        email = %subscription.email,
                        error = %e,
                        "Failed to hand off forecast"
                    );
                    outcome.send_failures += 1;
                },
            }
        }

        debug!(frequency = %frequency, city = %city, sent = outcome.sent, "City dispatched");
        outcome
    }
}

fn group_by_city(subscriptions: Vec<Subscription>) -> BTreeMap<City, Vec<Subscription>> {
    let mut groups: BTreeMap<City, Vec<Subscription>> = BTreeMap::new();
    for subscription in subscriptions {
        groups
            .entry(subscription.city.clone())
            .or_default()
            .push(subscription);
    }
    groups
}
