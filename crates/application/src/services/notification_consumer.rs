//! Queue consumer that turns jobs into emails
//!
//! Per message:
//! - payload decodes and the send succeeds: ack
//! - payload does not decode: reject without requeue (poison)
//! - send fails: reject with requeue
//!
//! The ack is only issued after the send returns, so a crash in between
//! produces a duplicate email rather than a lost one.

use std::{sync::Arc, time::Duration};

use thiserror::Error;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::{
    error::ApplicationError,
    jobs::{DecodeError, NotificationJob, queues},
    ports::{Delivery, NotificationPort, QueueConsumerPort},
};

/// Configuration for the consumer
#[derive(Debug, Clone)]
pub struct ConsumerConfig {
    /// Queues to service
    pub queues: Vec<String>,
    /// Concurrent workers per queue
    pub workers_per_queue: usize,
    /// Sleep between polls when a queue is empty
    pub poll_interval: Duration,
    /// Dead-letter after this many failed deliveries; `None` retries forever
    pub max_deliveries: Option<u32>,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            queues: queues::ALL.iter().map(ToString::to_string).collect(),
            workers_per_queue: 1,
            poll_interval: Duration::from_millis(500),
            max_deliveries: None,
        }
    }
}

/// What happened to one delivery
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Acked,
    /// Rejected without requeue: undecodable, or out of retries
    DeadLettered,
    /// Rejected with requeue
    Requeued,
}

#[derive(Debug, Error)]
enum ConsumeError {
    #[error("invalid payload: {0}")]
    InvalidPayload(#[from] DecodeError),
    #[error("delivery failed: {0}")]
    Delivery(ApplicationError),
}

/// Pulls jobs off the broker and sends them through a [`NotificationPort`]
pub struct NotificationConsumer {
    broker: Arc<dyn QueueConsumerPort>,
    notifier: Arc<dyn NotificationPort>,
    config: ConsumerConfig,
}

impl std::fmt::Debug for NotificationConsumer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationConsumer")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl NotificationConsumer {
    #[must_use]
    pub fn new(
        broker: Arc<dyn QueueConsumerPort>,
        notifier: Arc<dyn NotificationPort>,
        config: ConsumerConfig,
    ) -> Self {
        Self {
            broker,
            notifier,
            config,
        }
    }

    /// Run worker loops for every configured queue until `cancel` fires
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        let mut workers = JoinSet::new();

        for queue in &self.config.queues {
            for worker in 0..self.config.workers_per_queue.max(1) {
                let consumer = Arc::clone(&self);
                let queue = queue.clone();
                let cancel = cancel.clone();
                workers.spawn(async move { consumer.worker_loop(&queue, worker, cancel).await });
            }
        }

        info!(
            queues = ?self.config.queues,
            workers_per_queue = self.config.workers_per_queue,
            "Notification consumer started"
        );

        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "Consumer worker panicked");
            }
        }

        info!("Notification consumer stopped");
    }

    async fn worker_loop(&self, queue: &str, worker: usize, cancel: CancellationToken) {
        debug!(queue, worker, "Worker started");

        loop {
            let received = tokio::select! {
                () = cancel.cancelled() => break,
                received = self.broker.receive(queue) => received,
            };

            match received {
                Ok(Some(delivery)) => {
                    self.handle(&delivery).await;
                },
                Ok(None) => {
                    if Self::pause(&cancel, self.config.poll_interval).await {
                        break;
                    }
                },
                Err(e) => {
                    error!(queue, error = %e, "Failed to receive from broker");
                    if Self::pause(&cancel, self.config.poll_interval * 4).await {
                        break;
                    }
                },
            }
        }

        debug!(queue, worker, "Worker stopped");
    }

    /// Sleep unless cancelled; returns `true` when cancelled
    async fn pause(cancel: &CancellationToken, duration: Duration) -> bool {
        tokio::select! {
            () = cancel.cancelled() => true,
            () = tokio::time::sleep(duration) => false,
        }
    }

    /// Receive and settle at most one message from `queue`
    pub async fn poll_once(
        &self,
        queue: &str,
    ) -> Result<Option<DeliveryOutcome>, ApplicationError> {
        match self.broker.receive(queue).await? {
            Some(delivery) => Ok(Some(self.handle(&delivery).await)),
            None => Ok(None),
        }
    }

    /// Process one delivery and ack or reject it
    #[instrument(
        skip(self, delivery),
        fields(
            queue = %delivery.queue,
            delivery_id = %delivery.id,
            attempt = delivery.delivery_count
        )
    )]
    pub async fn handle(&self, delivery: &Delivery) -> DeliveryOutcome {
        let outcome = match self.process(delivery).await {
            Ok(()) => DeliveryOutcome::Acked,
            Err(ConsumeError::InvalidPayload(e)) => {
                error!(error = %e, "Poison message, rejecting without requeue");
                DeliveryOutcome::DeadLettered
            },
            Err(ConsumeError::Delivery(e)) if self.out_of_retries(delivery) => {
                error!(error = %e, "Delivery failed and retries are exhausted");
                DeliveryOutcome::DeadLettered
            },
            Err(ConsumeError::Delivery(e)) => {
                warn!(error = %e, "Delivery failed, requeueing");
                DeliveryOutcome::Requeued
            },
        };

        let settled = match outcome {
            DeliveryOutcome::Acked => self.broker.ack(delivery).await,
            DeliveryOutcome::DeadLettered => self.broker.reject(delivery, false).await,
            DeliveryOutcome::Requeued => self.broker.reject(delivery, true).await,
        };

        if let Err(e) = settled {
            error!(outcome = ?outcome, error = %e, "Failed to settle delivery with broker");
        }

        metrics::counter!(
            "notification_deliveries_total",
            "queue" => delivery.queue.clone(),
            "outcome" => outcome.label()
        )
        .increment(1);

        outcome
    }

    async fn process(&self, delivery: &Delivery) -> Result<(), ConsumeError> {
        let job = NotificationJob::decode(&delivery.queue, &delivery.payload)?;

        let sent = match &job {
            NotificationJob::Confirmation(job) => self.notifier.send_confirmation(job).await,
            NotificationJob::Forecast(job) => self.notifier.send_forecast(job).await,
        };

        sent.map_err(ConsumeError::Delivery)?;
        debug!("Notification sent");
        Ok(())
    }

    fn out_of_retries(&self, delivery: &Delivery) -> bool {
        self.config
            .max_deliveries
            .is_some_and(|max| delivery.delivery_count >= max)
    }
}

impl DeliveryOutcome {
    const fn label(self) -> &'static str {
        match self {
            Self::Acked => "acked",
            Self::DeadLettered => "dead_lettered",
            Self::Requeued => "requeued",
        }
    }
}

#[cfg(test)]
mod tests {
    use domain::{City, EmailAddress, WeatherSnapshot};
    use mockall::predicate::eq;

    use super::*;
    use crate::{
        jobs::{ConfirmationJob, Forecast, ForecastJob, ForecastRecipient},
        ports::{MockNotificationPort, MockQueueConsumerPort},
    };

    fn delivery(queue: &str, payload: Vec<u8>, delivery_count: u32) -> Delivery {
        Delivery {
            id: "msg-1".into(),
            queue: queue.into(),
            payload,
            delivery_count,
        }
    }

    fn hourly_payload() -> Vec<u8> {
        ForecastJob::new(
            ForecastRecipient {
                email: EmailAddress::new("a@x.com").unwrap(),
                city: City::new("Kyiv").unwrap(),
            },
            &Forecast::Current(WeatherSnapshot::new(22.0, 40.0, "Sunny")),
            "2025-05-17 07:00:00",
            "link",
        )
        .to_payload()
        .unwrap()
    }

    fn consumer(
        broker: MockQueueConsumerPort,
        notifier: MockNotificationPort,
        max_deliveries: Option<u32>,
    ) -> NotificationConsumer {
        NotificationConsumer::new(
            Arc::new(broker),
            Arc::new(notifier),
            ConsumerConfig {
                max_deliveries,
                ..ConsumerConfig::default()
            },
        )
    }

    #[tokio::test]
    async fn successful_send_is_acked() {
        let mut broker = MockQueueConsumerPort::new();
        broker.expect_ack().times(1).returning(|_| Ok(()));
        broker.expect_reject().never();

        let mut notifier = MockNotificationPort::new();
        notifier.expect_send_forecast().times(1).returning(|_| Ok(()));

        let outcome = consumer(broker, notifier, None)
            .handle(&delivery(queues::HOURLY_FORECAST, hourly_payload(), 1))
            .await;

        assert_eq!(outcome, DeliveryOutcome::Acked);
    }

    #[tokio::test]
    async fn malformed_payload_is_rejected_without_requeue() {
        let mut broker = MockQueueConsumerPort::new();
        broker.expect_ack().never();
        broker
            .expect_reject()
            .with(mockall::predicate::always(), eq(false))
            .times(1)
            .returning(|_, _| Ok(()));

        let mut notifier = MockNotificationPort::new();
        notifier.expect_send_forecast().never();

        let outcome = consumer(broker, notifier, None)
            .handle(&delivery(queues::HOURLY_FORECAST, b"{\"weather\":".to_vec(), 1))
            .await;

        assert_eq!(outcome, DeliveryOutcome::DeadLettered);
    }

    #[tokio::test]
    async fn send_failure_is_requeued() {
        let mut broker = MockQueueConsumerPort::new();
        broker
            .expect_reject()
            .with(mockall::predicate::always(), eq(true))
            .times(1)
            .returning(|_, _| Ok(()));

        let mut notifier = MockNotificationPort::new();
        notifier
            .expect_send_forecast()
            .returning(|_| Err(ApplicationError::ExternalService("smtp timeout".into())));

        let outcome = consumer(broker, notifier, None)
            .handle(&delivery(queues::HOURLY_FORECAST, hourly_payload(), 3))
            .await;

        assert_eq!(outcome, DeliveryOutcome::Requeued);
    }

    #[tokio::test]
    async fn send_failure_past_max_deliveries_is_dead_lettered() {
        let mut broker = MockQueueConsumerPort::new();
        broker
            .expect_reject()
            .with(mockall::predicate::always(), eq(false))
            .times(1)
            .returning(|_, _| Ok(()));

        let mut notifier = MockNotificationPort::new();
        notifier
            .expect_send_forecast()
            .returning(|_| Err(ApplicationError::ExternalService("smtp timeout".into())));

        let outcome = consumer(broker, notifier, Some(5))
            .handle(&delivery(queues::HOURLY_FORECAST, hourly_payload(), 5))
            .await;

        assert_eq!(outcome, DeliveryOutcome::DeadLettered);
    }

    #[tokio::test]
    async fn confirmation_queue_routes_to_confirmation_send() {
        let payload = serde_json::to_vec(&ConfirmationJob {
            email: EmailAddress::new("new@x.com").unwrap(),
            confirmation_link: "https://w/api/confirm/t".into(),
        })
        .unwrap();

        let mut broker = MockQueueConsumerPort::new();
        broker.expect_ack().times(1).returning(|_| Ok(()));

        let mut notifier = MockNotificationPort::new();
        notifier
            .expect_send_confirmation()
            .withf(|job| job.email.as_str() == "new@x.com")
            .times(1)
            .returning(|_| Ok(()));

        let outcome = consumer(broker, notifier, None)
            .handle(&delivery(queues::CONFIRMATION, payload, 1))
            .await;

        assert_eq!(outcome, DeliveryOutcome::Acked);
    }

    #[tokio::test]
    async fn broker_ack_failure_does_not_change_outcome() {
        let mut broker = MockQueueConsumerPort::new();
        broker
            .expect_ack()
            .returning(|_| Err(ApplicationError::ExternalService("connection reset".into())));

        let mut notifier = MockNotificationPort::new();
        notifier.expect_send_forecast().returning(|_| Ok(()));

        let outcome = consumer(broker, notifier, None)
            .handle(&delivery(queues::HOURLY_FORECAST, hourly_payload(), 1))
            .await;

        assert_eq!(outcome, DeliveryOutcome::Acked);
    }

    #[tokio::test]
    async fn poll_once_on_empty_queue_returns_none() {
        let mut broker = MockQueueConsumerPort::new();
        broker.expect_receive().returning(|_| Ok(None));

        let result = consumer(broker, MockNotificationPort::new(), None)
            .poll_once(queues::DAILY_FORECAST)
            .await
            .unwrap();

        assert!(result.is_none());
    }

    #[tokio::test]
    async fn run_stops_when_cancelled() {
        let mut broker = MockQueueConsumerPort::new();
        broker.expect_receive().returning(|_| Ok(None));

        let consumer = Arc::new(NotificationConsumer::new(
            Arc::new(broker),
            Arc::new(MockNotificationPort::new()),
            ConsumerConfig {
                poll_interval: Duration::from_millis(10),
                ..ConsumerConfig::default()
            },
        ));

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(Arc::clone(&consumer).run(cancel.clone()));

        tokio::time::sleep(Duration::from_millis(30)).await;
        cancel.cancel();

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
