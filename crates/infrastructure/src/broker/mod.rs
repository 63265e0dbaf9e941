//! Notification queue brokers
//!
//! Both brokers give at-least-once delivery: a received message is hidden
//! for the visibility timeout and comes back if it is neither acked nor
//! rejected in time.

mod in_memory;
mod sqlite;

use std::time::Duration;

use application::error::ApplicationError;
use thiserror::Error;

pub use in_memory::InMemoryQueueBroker;
pub use sqlite::{DeadLetter, SqliteQueueBroker};

/// How long a received message stays hidden before it is redelivered
pub const DEFAULT_VISIBILITY_TIMEOUT: Duration = Duration::from_secs(30);

/// Reason recorded when a consumer rejects without requeue
pub(crate) const REJECTED_REASON: &str = "rejected without requeue";

/// Broker failures
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Queue not declared: {0}")]
    UndeclaredQueue(String),

    /// Ack/reject for a message the broker no longer holds
    #[error("Unknown delivery {id} on {queue}")]
    UnknownDelivery { queue: String, id: String },
}

impl From<QueueError> for ApplicationError {
    fn from(e: QueueError) -> Self {
        match e {
            QueueError::Database(e) => crate::persistence::map_sqlx_error(e),
            QueueError::UndeclaredQueue(queue) => {
                Self::Configuration(format!("Queue not declared: {queue}"))
            },
            QueueError::UnknownDelivery { queue, id } => {
                Self::NotFound(format!("Delivery {id} on {queue}"))
            },
        }
    }
}

fn visibility(timeout: Duration) -> chrono::Duration {
    chrono::Duration::from_std(timeout).unwrap_or(chrono::Duration::seconds(30))
}
