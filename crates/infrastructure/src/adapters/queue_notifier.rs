//! Queue notifier - Implements `NotificationPort` by publishing jobs

use std::sync::Arc;

use application::{
    error::ApplicationError,
    jobs::{ConfirmationJob, ForecastJob, queues},
    ports::{NotificationPort, QueuePublisherPort},
};
use async_trait::async_trait;
use tracing::{debug, info, instrument};

/// Serializes jobs to JSON and publishes them to the queue for their kind
pub struct QueueNotifier {
    publisher: Arc<dyn QueuePublisherPort>,
}

impl std::fmt::Debug for QueueNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueueNotifier").finish_non_exhaustive()
    }
}

impl QueueNotifier {
    #[must_use]
    pub fn new(publisher: Arc<dyn QueuePublisherPort>) -> Self {
        Self { publisher }
    }

    /// Declare one durable queue per job kind
    pub async fn declare_all(&self) -> Result<(), ApplicationError> {
        for queue in queues::ALL {
            self.publisher.declare_queue(queue).await?;
        }
        info!(queues = ?queues::ALL, "Notification queues declared");
        Ok(())
    }

    async fn publish(
        &self,
        queue: &str,
        payload: serde_json::Result<Vec<u8>>,
    ) -> Result<(), ApplicationError> {
        let payload = payload
            .map_err(|e| ApplicationError::Internal(format!("Failed to encode job: {e}")))?;
        self.publisher.publish(queue, payload).await?;
        debug!(queue, "Job published");
        Ok(())
    }
}

#[async_trait]
impl NotificationPort for QueueNotifier {
    #[instrument(skip(self, job), fields(email = %job.email))]
    async fn send_confirmation(&self, job: &ConfirmationJob) -> Result<(), ApplicationError> {
        self.publish(queues::CONFIRMATION, serde_json::to_vec(job)).await
    }

    #[instrument(skip(self, job), fields(email = %job.recipient().email, queue = job.queue()))]
    async fn send_forecast(&self, job: &ForecastJob) -> Result<(), ApplicationError> {
        self.publish(job.queue(), job.to_payload()).await
    }
}
