//! Process-local broker for tests and single-process deployments

use std::{
    collections::{BTreeMap, HashMap, VecDeque},
    sync::Arc,
    time::Duration,
};

use application::{
    error::ApplicationError,
    ports::{ClockPort, Delivery, QueueConsumerPort, QueuePublisherPort, QueueStats, SystemClock},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

use super::{DEFAULT_VISIBILITY_TIMEOUT, QueueError, visibility};

#[derive(Debug, Clone)]
struct Message {
    id: String,
    payload: Vec<u8>,
    delivery_count: u32,
}

#[derive(Debug, Default)]
struct QueueState {
    ready: VecDeque<Message>,
    in_flight: HashMap<String, (Message, DateTime<Utc>)>,
    dead: Vec<Message>,
}

impl QueueState {
    /// Move expired in-flight messages back to the front of the queue
    fn reclaim_expired(&mut self, now: DateTime<Utc>) {
        let expired: Vec<String> = self
            .in_flight
            .iter()
            .filter(|(_, (_, deadline))| *deadline <= now)
            .map(|(id, _)| id.clone())
            .collect();

        for id in expired {
            if let Some((message, _)) = self.in_flight.remove(&id) {
                self.ready.push_front(message);
            }
        }
    }
}

/// Broker state behind a synchronous mutex; no lock is held across `.await`
pub struct InMemoryQueueBroker {
    queues: Mutex<HashMap<String, QueueState>>,
    clock: Arc<dyn ClockPort>,
    visibility_timeout: Duration,
}

impl std::fmt::Debug for InMemoryQueueBroker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryQueueBroker")
            .field("queues", &self.queues.lock().len())
            .field("visibility_timeout", &self.visibility_timeout)
            .finish_non_exhaustive()
    }
}

impl Default for InMemoryQueueBroker {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryQueueBroker {
    #[must_use]
    pub fn new() -> Self {
        Self {
            queues: Mutex::new(HashMap::new()),
            clock: Arc::new(SystemClock),
            visibility_timeout: DEFAULT_VISIBILITY_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn ClockPort>) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub const fn with_visibility_timeout(mut self, timeout: Duration) -> Self {
        self.visibility_timeout = timeout;
        self
    }

    /// Payloads of dead-lettered messages on `queue`
    #[must_use]
    pub fn dead_letters(&self, queue: &str) -> Vec<Vec<u8>> {
        self.queues
            .lock()
            .get(queue)
            .map(|q| q.dead.iter().map(|m| m.payload.clone()).collect())
            .unwrap_or_default()
    }

    fn settle<T>(
        &self,
        delivery: &Delivery,
        f: impl FnOnce(&mut QueueState, Message) -> T,
    ) -> Result<T, QueueError> {
        let mut queues = self.queues.lock();
        let state = queues
            .get_mut(&delivery.queue)
            .ok_or_else(|| QueueError::UndeclaredQueue(delivery.queue.clone()))?;
        // A lapsed claim that was handed out again belongs to the new holder
        let current = state
            .in_flight
            .get(&delivery.id)
            .is_some_and(|(m, _)| m.delivery_count == delivery.delivery_count);
        let (message, _) = current
            .then(|| state.in_flight.remove(&delivery.id))
            .flatten()
            .ok_or_else(|| QueueError::UnknownDelivery {
                queue: delivery.queue.clone(),
                id: delivery.id.clone(),
            })?;
        Ok(f(state, message))
    }
}

#[async_trait]
impl QueuePublisherPort for InMemoryQueueBroker {
    async fn declare_queue(&self, queue: &str) -> Result<(), ApplicationError> {
        self.queues.lock().entry(queue.to_string()).or_default();
        Ok(())
    }

    async fn publish(&self, queue: &str, payload: Vec<u8>) -> Result<(), ApplicationError> {
        let mut queues = self.queues.lock();
        let state = queues
            .get_mut(queue)
            .ok_or_else(|| QueueError::UndeclaredQueue(queue.to_string()))?;
        state.ready.push_back(Message {
            id: Uuid::now_v7().to_string(),
            payload,
            delivery_count: 0,
        });
        Ok(())
    }
}

#[async_trait]
impl QueueConsumerPort for InMemoryQueueBroker {
    async fn receive(&self, queue: &str) -> Result<Option<Delivery>, ApplicationError> {
        let now = self.clock.now();
        let mut queues = self.queues.lock();
        let Some(state) = queues.get_mut(queue) else {
            return Ok(None);
        };

        state.reclaim_expired(now);
        let Some(mut message) = state.ready.pop_front() else {
            return Ok(None);
        };

        message.delivery_count += 1;
        let delivery = Delivery {
            id: message.id.clone(),
            queue: queue.to_string(),
            payload: message.payload.clone(),
            delivery_count: message.delivery_count,
        };
        let deadline = now + visibility(self.visibility_timeout);
        state
            .in_flight
            .insert(message.id.clone(), (message, deadline));

        Ok(Some(delivery))
    }

    async fn ack(&self, delivery: &Delivery) -> Result<(), ApplicationError> {
        self.settle(delivery, |_, _| ())?;
        debug!(queue = %delivery.queue, delivery_id = %delivery.id, "Message acked");
        Ok(())
    }

    async fn reject(&self, delivery: &Delivery, requeue: bool) -> Result<(), ApplicationError> {
        self.settle(delivery, |state, message| {
            if requeue {
                state.ready.push_back(message);
            } else {
                state.dead.push(message);
            }
        })?;

        if !requeue {
            warn!(queue = %delivery.queue, delivery_id = %delivery.id, "Message dead-lettered");
        }
        Ok(())
    }

    async fn stats(&self) -> Result<BTreeMap<String, QueueStats>, ApplicationError> {
        let now = self.clock.now();
        let mut queues = self.queues.lock();
        let stats = queues
            .iter_mut()
            .map(|(name, state)| {
                state.reclaim_expired(now);
                (name.clone(), QueueStats {
                    ready: state.ready.len() as u64,
                    in_flight: state.in_flight.len() as u64,
                    dead_lettered: state.dead.len() as u64,
                })
            })
            .collect();
        Ok(stats)
    }
}
