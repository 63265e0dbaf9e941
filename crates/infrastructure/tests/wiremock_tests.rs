//! End-to-end tests over mocked provider HTTP
//!
//! Real provider clients run behind the chain, cache and dispatcher; jobs
//! travel through the in-memory broker to a recording email sender.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::sync::Arc;

use application::{
    ApplicationError,
    jobs::queues,
    ports::{
        EmailSenderPort, OutgoingEmail, QueueConsumerPort, SubscriptionStorePort, SystemClock,
        WeatherPort,
    },
    services::{
        ConsumerConfig, DeliveryOutcome, DispatcherConfig, ForecastDispatcher,
        NotificationConsumer,
    },
};
use async_trait::async_trait;
use domain::{City, EmailAddress, Frequency, Subscription, SubscriptionToken};
use infrastructure::{
    CachedWeatherAdapter, EmailSubjects, InMemoryQueueBroker, MokaCache, QueueNotifier,
    TemplateEngine, TemplatedEmailNotifier, WeatherAdapter,
};
use integration_weather::{
    ProviderChain, ProviderConfig, VisualCrossingClient, WeatherApiClient, WeatherProvider,
};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path, query_param},
};

// ============================================================================
// Test Helpers
// ============================================================================

async fn chain(weatherapi: &MockServer, visual_crossing: &MockServer) -> ProviderChain {
    let providers: Vec<Arc<dyn WeatherProvider>> = vec![
        Arc::new(WeatherApiClient::new(ProviderConfig::new("wa-key", weatherapi.uri())).unwrap()),
        Arc::new(
            VisualCrossingClient::new(ProviderConfig::new("vc-key", visual_crossing.uri()))
                .unwrap(),
        ),
    ];
    ProviderChain::new(providers).unwrap()
}

fn weatherapi_current(temp: f32, text: &str) -> serde_json::Value {
    serde_json::json!({
        "current": {"temp_c": temp, "humidity": 40, "condition": {"text": text}}
    })
}

fn weatherapi_day(temp: f32, text: &str) -> serde_json::Value {
    let hours: Vec<serde_json::Value> = (0..24)
        .map(|h| {
            serde_json::json!({
                "time": format!("2025-05-17 {h:02}:00"),
                "temp_c": temp,
                "humidity": 40,
                "condition": {"text": text}
            })
        })
        .collect();
    serde_json::json!({"forecast": {"forecastday": [{"hour": hours}]}})
}

struct FixedStore(Vec<Subscription>);

#[async_trait]
impl SubscriptionStorePort for FixedStore {
    async fn create(&self, _: &Subscription) -> Result<(), ApplicationError> {
        Ok(())
    }

    async fn find_by_token(
        &self,
        _: &SubscriptionToken,
    ) -> Result<Option<Subscription>, ApplicationError> {
        Ok(None)
    }

    async fn confirm(&self, token: &SubscriptionToken) -> Result<Subscription, ApplicationError> {
        Err(ApplicationError::NotFound(token.to_string()))
    }

    async fn unsubscribe(&self, _: &SubscriptionToken) -> Result<(), ApplicationError> {
        Ok(())
    }

    async fn get_confirmed_by_frequency(
        &self,
        frequency: Frequency,
    ) -> Result<Vec<Subscription>, ApplicationError> {
        Ok(self
            .0
            .iter()
            .filter(|s| s.confirmed && s.frequency == frequency)
            .cloned()
            .collect())
    }
}

fn confirmed(email: &str, city: &str, frequency: Frequency) -> Subscription {
    let mut sub = Subscription::new(
        EmailAddress::new(email).unwrap(),
        City::new(city).unwrap(),
        frequency,
        chrono::Utc::now(),
    );
    sub.confirm();
    sub
}

#[derive(Default)]
struct RecordingSender {
    sent: Mutex<Vec<OutgoingEmail>>,
}

#[async_trait]
impl EmailSenderPort for RecordingSender {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), ApplicationError> {
        self.sent.lock().push(email.clone());
        Ok(())
    }
}

// ============================================================================
// Chain and cache over HTTP
// ============================================================================

#[tokio::test]
async fn unknown_city_falls_through_to_next_provider() {
    let wa = MockServer::start().await;
    let vc = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/current.json"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "error": {"code": 1006, "message": "No matching location found."}
        })))
        .expect(1)
        .mount(&wa)
        .await;
    Mock::given(method("GET"))
        .and(path("/Uzhhorod/today"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "currentConditions": {"temp": 18.0, "humidity": 55.0, "conditions": "Clear"}
        })))
        .expect(1)
        .mount(&vc)
        .await;

    let adapter = WeatherAdapter::from_chain(chain(&wa, &vc).await);
    let weather = adapter
        .get_current_weather(&City::new("Uzhhorod").unwrap())
        .await
        .unwrap();

    assert_eq!(weather.description, "Clear");
}

#[tokio::test]
async fn all_providers_unknown_city_is_city_not_found() {
    let wa = MockServer::start().await;
    let vc = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "error": {"code": 1006, "message": "No matching location found."}
        })))
        .mount(&wa)
        .await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_string("Bad API Request:Invalid location parameter value."),
        )
        .mount(&vc)
        .await;

    let adapter = WeatherAdapter::from_chain(chain(&wa, &vc).await);
    let result = adapter.get_current_weather(&City::new("Atlantis").unwrap()).await;

    assert!(matches!(result, Err(ApplicationError::CityNotFound(_))));
}

#[tokio::test]
async fn cached_lookup_skips_upstream() {
    let wa = MockServer::start().await;
    let vc = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/current.json"))
        .and(query_param("q", "Kyiv"))
        .respond_with(ResponseTemplate::new(200).set_body_json(weatherapi_current(22.0, "Sunny")))
        .expect(1)
        .mount(&wa)
        .await;

    let adapter = CachedWeatherAdapter::new(
        WeatherAdapter::from_chain(chain(&wa, &vc).await),
        Arc::new(MokaCache::new()),
        Arc::new(SystemClock),
    );
    let kyiv = City::new("Kyiv").unwrap();

    let first = adapter.get_current_weather(&kyiv).await.unwrap();
    let second = adapter.get_current_weather(&kyiv).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(second.description, "Sunny");
}

// ============================================================================
// Fan-out
// ============================================================================

#[tokio::test]
async fn daily_fanout_skips_failing_city() {
    let wa = MockServer::start().await;
    let vc = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/forecast.json"))
        .and(query_param("q", "Kyiv"))
        .respond_with(ResponseTemplate::new(200).set_body_json(weatherapi_day(22.0, "Sunny")))
        .expect(1)
        .mount(&wa)
        .await;
    Mock::given(method("GET"))
        .and(path("/forecast.json"))
        .and(query_param("q", "Lviv"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&wa)
        .await;
    Mock::given(method("GET"))
        .and(path("/Lviv/today"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&vc)
        .await;

    let broker = Arc::new(InMemoryQueueBroker::new());
    let queue_notifier = QueueNotifier::new(broker.clone());
    queue_notifier.declare_all().await.unwrap();

    let store = FixedStore(vec![
        confirmed("a@example.com", "Kyiv", Frequency::Daily),
        confirmed("b@example.com", "Kyiv", Frequency::Daily),
        confirmed("c@example.com", "Lviv", Frequency::Daily),
    ]);
    let dispatcher = ForecastDispatcher::new(
        Arc::new(store),
        Arc::new(WeatherAdapter::from_chain(chain(&wa, &vc).await)),
        Arc::new(queue_notifier),
        Arc::new(SystemClock),
        DispatcherConfig {
            base_url: "https://weather.example.com".into(),
            max_concurrent_cities: 2,
        },
    );

    let report = dispatcher
        .send_daily_forecast(&CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(report.subscriptions, 3);
    assert_eq!(report.cities, 2);
    assert_eq!(report.cities_failed, 1);
    assert_eq!(report.notifications_sent, 2);

    let stats = broker.stats().await.unwrap();
    assert_eq!(stats[queues::DAILY_FORECAST].ready, 2);

    let sender = Arc::new(RecordingSender::default());
    let consumer = NotificationConsumer::new(
        broker.clone(),
        Arc::new(TemplatedEmailNotifier::new(
            TemplateEngine::new().unwrap(),
            sender.clone(),
            EmailSubjects::default(),
        )),
        ConsumerConfig::default(),
    );
    while let Some(outcome) = consumer.poll_once(queues::DAILY_FORECAST).await.unwrap() {
        assert_eq!(outcome, DeliveryOutcome::Acked);
    }

    let sent = sender.sent.lock();
    let mut recipients: Vec<&str> = sent.iter().map(|e| e.to.as_str()).collect();
    recipients.sort_unstable();
    assert_eq!(recipients, vec!["a@example.com", "b@example.com"]);
    for email in sent.iter() {
        assert_eq!(email.subject, "Weather forecast for Kyiv");
        assert!(email.html_body.contains("22.0°C"));
        assert!(email.html_body.contains("Sunny"));
        assert!(email.html_body.contains("/api/unsubscribe/"));
    }
}
