//! Message broker ports
//!
//! At-least-once delivery with manual acknowledgement. A delivery stays
//! invisible to other consumers until it is acked, rejected, or its
//! visibility timeout lapses.

use std::collections::BTreeMap;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use crate::error::ApplicationError;

/// A message handed to a consumer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    /// Broker-assigned identifier, used for ack/reject
    pub id: String,
    pub queue: String,
    pub payload: Vec<u8>,
    /// How many times this message has been handed out, including this one
    pub delivery_count: u32,
}

/// Publishing side
#[cfg_attr(test, automock)]
#[async_trait]
pub trait QueuePublisherPort: Send + Sync {
    /// Declare a durable queue; declaring an existing queue is a no-op
    async fn declare_queue(&self, queue: &str) -> Result<(), ApplicationError>;

    async fn publish(&self, queue: &str, payload: Vec<u8>) -> Result<(), ApplicationError>;
}

/// Consuming side
#[cfg_attr(test, automock)]
#[async_trait]
pub trait QueueConsumerPort: Send + Sync {
    /// Claim the next message, or `None` if the queue is empty
    async fn receive(&self, queue: &str) -> Result<Option<Delivery>, ApplicationError>;

    /// Processing finished; remove the message
    async fn ack(&self, delivery: &Delivery) -> Result<(), ApplicationError>;

    /// Processing failed; redeliver when `requeue`, otherwise dead-letter
    async fn reject(&self, delivery: &Delivery, requeue: bool) -> Result<(), ApplicationError>;

    /// Per-queue counts, keyed by queue name
    async fn stats(&self) -> Result<BTreeMap<String, QueueStats>, ApplicationError>;
}

/// Message counts for one queue
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStats {
    pub ready: u64,
    pub in_flight: u64,
    pub dead_lettered: u64,
}
