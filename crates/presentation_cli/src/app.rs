//! Wiring of adapters into the application services

use std::sync::Arc;

use anyhow::Context;
use application::{
    ports::{ClockPort, SystemClock},
    services::{ForecastDispatcher, NotificationConsumer, SubscriptionService},
};
use infrastructure::{
    AppConfig, AsyncDatabase, CachedWeatherAdapter, MokaCache, QueueNotifier, SmtpEmailSender,
    SqliteQueueBroker, SqliteSubscriptionStore, TemplateEngine, TemplatedEmailNotifier,
    WeatherAdapter,
    config::{consumer_config, dispatcher_config},
};
use tracing::info;

/// Shared handles built once per process
pub struct App {
    pub config: AppConfig,
    pub db: AsyncDatabase,
    pub store: Arc<SqliteSubscriptionStore>,
    pub broker: Arc<SqliteQueueBroker>,
    clock: Arc<dyn ClockPort>,
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("environment", &self.config.environment)
            .finish_non_exhaustive()
    }
}

impl App {
    /// Open the database, run migrations if enabled and declare the queues
    pub async fn new(config: AppConfig) -> anyhow::Result<Self> {
        let db = AsyncDatabase::new(&config.database.to_async_config())
            .await
            .with_context(|| format!("opening database {}", config.database.path))?;
        if config.database.run_migrations {
            db.migrate().await.context("running migrations")?;
        }

        let clock: Arc<dyn ClockPort> = Arc::new(SystemClock);
        let store = Arc::new(SqliteSubscriptionStore::new(db.pool().clone()));
        let broker = Arc::new(
            SqliteQueueBroker::new(db.pool().clone())
                .with_clock(Arc::clone(&clock))
                .with_visibility_timeout(config.consumer.visibility_timeout()),
        );

        QueueNotifier::new(broker.clone())
            .declare_all()
            .await
            .context("declaring queues")?;

        info!(environment = %config.environment, "Application wired");
        Ok(Self {
            config,
            db,
            store,
            broker,
            clock,
        })
    }

    fn queue_notifier(&self) -> Arc<QueueNotifier> {
        Arc::new(QueueNotifier::new(self.broker.clone()))
    }

    pub fn subscription_service(&self) -> SubscriptionService {
        SubscriptionService::new(
            self.store.clone(),
            self.queue_notifier(),
            Arc::clone(&self.clock),
            self.config.http.base_url.trim_end_matches('/'),
        )
    }

    /// Dispatcher over the cached provider chain
    ///
    /// Fails when no weather provider is configured.
    pub fn forecast_dispatcher(&self) -> anyhow::Result<Arc<ForecastDispatcher>> {
        let chain = self
            .config
            .weather
            .build_chain()
            .context("building weather provider chain")?;
        let cache = MokaCache::with_config(self.config.cache.into());
        let weather = CachedWeatherAdapter::new(
            WeatherAdapter::from_chain(chain),
            Arc::new(cache),
            Arc::clone(&self.clock),
        );

        Ok(Arc::new(ForecastDispatcher::new(
            self.store.clone(),
            Arc::new(weather),
            self.queue_notifier(),
            Arc::clone(&self.clock),
            dispatcher_config(&self.config.http, self.config.dispatcher),
        )))
    }

    /// Consumer that renders templates and sends over SMTP
    pub fn notification_consumer(&self) -> anyhow::Result<Arc<NotificationConsumer>> {
        let templates = TemplateEngine::with_config(self.config.email.template_config())
            .context("loading email templates")?;
        let sender = SmtpEmailSender::new(&self.config.smtp).context("configuring SMTP")?;
        let notifier = TemplatedEmailNotifier::new(
            templates,
            Arc::new(sender),
            self.config.email.subjects.clone(),
        );

        Ok(Arc::new(NotificationConsumer::new(
            self.broker.clone(),
            Arc::new(notifier),
            consumer_config(self.config.consumer),
        )))
    }
}

#[cfg(test)]
mod tests {
    use application::{jobs::queues, ports::QueueConsumerPort};
    use domain::Frequency;

    use super::*;

    async fn app(dir: &tempfile::TempDir) -> App {
        let mut config = AppConfig::default();
        config.database.path = dir.path().join("weatherfan.db").display().to_string();
        App::new(config).await.unwrap()
    }

    #[tokio::test]
    async fn wiring_declares_every_queue() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(&dir).await;

        let stats = app.broker.stats().await.unwrap();
        for queue in queues::ALL {
            assert_eq!(stats[queue].ready, 0, "{queue}");
        }
    }

    #[tokio::test]
    async fn subscribe_queues_a_confirmation() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(&dir).await;

        app.subscription_service()
            .subscribe("anna@example.com", "Kyiv", Frequency::Hourly)
            .await
            .unwrap();

        let stats = app.broker.stats().await.unwrap();
        assert_eq!(stats[queues::CONFIRMATION].ready, 1);
    }

    #[tokio::test]
    async fn dispatcher_requires_a_provider() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(&dir).await;

        let err = app.forecast_dispatcher().unwrap_err();
        assert!(err.to_string().contains("weather provider chain"));
    }

    #[tokio::test]
    async fn consumer_builds_with_default_smtp() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(&dir).await;

        assert!(app.notification_consumer().is_ok());
    }
}
