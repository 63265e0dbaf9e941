//! Durable broker on the shared SQLite pool

use std::{collections::BTreeMap, sync::Arc, time::Duration};

use application::{
    error::ApplicationError,
    ports::{ClockPort, Delivery, QueueConsumerPort, QueuePublisherPort, QueueStats, SystemClock},
};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::SqlitePool;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use super::{DEFAULT_VISIBILITY_TIMEOUT, QueueError, REJECTED_REASON, visibility};

#[derive(sqlx::FromRow)]
struct DeliveryRow {
    id: String,
    queue: String,
    payload: Vec<u8>,
    delivery_count: i64,
}

impl DeliveryRow {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn to_delivery(self) -> Delivery {
        Delivery {
            id: self.id,
            queue: self.queue,
            payload: self.payload,
            delivery_count: self.delivery_count.max(0) as u32,
        }
    }
}

/// A message that was rejected without requeue
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct DeadLetter {
    pub id: String,
    pub queue: String,
    pub payload: Vec<u8>,
    pub delivery_count: i64,
    pub reason: String,
    pub dead_lettered_at: String,
}

/// Queue broker persisted in the `queue_messages` and `dead_letters` tables
///
/// Ack and reject match on `delivery_count` as well as the id, so a worker
/// whose claim lapsed cannot settle the redelivery another worker holds.
#[derive(Clone)]
pub struct SqliteQueueBroker {
    pool: SqlitePool,
    clock: Arc<dyn ClockPort>,
    visibility_timeout: Duration,
}

impl std::fmt::Debug for SqliteQueueBroker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteQueueBroker")
            .field("visibility_timeout", &self.visibility_timeout)
            .finish_non_exhaustive()
    }
}

impl SqliteQueueBroker {
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
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

    fn now(&self) -> String {
        timestamp(self.clock.now())
    }

    async fn ensure_declared(&self, queue: &str) -> Result<(), QueueError> {
        let declared: bool =
            sqlx::query_scalar("SELECT COUNT(*) > 0 FROM queues WHERE name = $1")
                .bind(queue)
                .fetch_one(&self.pool)
                .await?;

        if declared {
            Ok(())
        } else {
            Err(QueueError::UndeclaredQueue(queue.to_string()))
        }
    }

    async fn claim(&self, queue: &str) -> Result<Option<Delivery>, QueueError> {
        let now = self.clock.now();
        let locked_until = timestamp(now + visibility(self.visibility_timeout));

        // Single statement, so two workers can never claim the same row
        let row: Option<DeliveryRow> = sqlx::query_as(
            "UPDATE queue_messages
             SET locked_until = $1, delivery_count = delivery_count + 1
             WHERE id = (
                 SELECT id FROM queue_messages
                 WHERE queue = $2 AND (locked_until IS NULL OR locked_until <= $3)
                 ORDER BY enqueued_at, rowid
                 LIMIT 1
             )
             RETURNING id, queue, payload, delivery_count",
        )
        .bind(&locked_until)
        .bind(queue)
        .bind(timestamp(now))
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(DeliveryRow::to_delivery))
    }

    async fn dead_letter(&self, delivery: &Delivery, reason: &str) -> Result<(), QueueError> {
        let mut tx = self.pool.begin().await?;

        let moved = sqlx::query(
            "INSERT INTO dead_letters
                 (id, queue, payload, delivery_count, reason, enqueued_at, dead_lettered_at)
             SELECT id, queue, payload, delivery_count, $1, enqueued_at, $2
             FROM queue_messages WHERE id = $3 AND queue = $4 AND delivery_count = $5",
        )
        .bind(reason)
        .bind(self.now())
        .bind(&delivery.id)
        .bind(&delivery.queue)
        .bind(i64::from(delivery.delivery_count))
        .execute(&mut *tx)
        .await?;

        if moved.rows_affected() == 0 {
            return Err(unknown(delivery));
        }

        sqlx::query("DELETE FROM queue_messages WHERE id = $1")
            .bind(&delivery.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Dead letters for `queue`, oldest first
    pub async fn dead_letters(&self, queue: &str) -> Result<Vec<DeadLetter>, ApplicationError> {
        let rows = sqlx::query_as(
            "SELECT id, queue, payload, delivery_count, reason, dead_lettered_at
             FROM dead_letters WHERE queue = $1 ORDER BY dead_lettered_at, rowid",
        )
        .bind(queue)
        .fetch_all(&self.pool)
        .await
        .map_err(QueueError::from)?;
        Ok(rows)
    }
}

#[async_trait]
impl QueuePublisherPort for SqliteQueueBroker {
    #[instrument(skip(self))]
    async fn declare_queue(&self, queue: &str) -> Result<(), ApplicationError> {
        sqlx::query("INSERT OR IGNORE INTO queues (name, declared_at) VALUES ($1, $2)")
            .bind(queue)
            .bind(self.now())
            .execute(&self.pool)
            .await
            .map_err(QueueError::from)?;
        debug!(queue, "Queue declared");
        Ok(())
    }

    #[instrument(skip(self, payload), fields(bytes = payload.len()))]
    async fn publish(&self, queue: &str, payload: Vec<u8>) -> Result<(), ApplicationError> {
        self.ensure_declared(queue).await?;

        let id = Uuid::now_v7().to_string();
        sqlx::query(
            "INSERT INTO queue_messages (id, queue, payload, delivery_count, locked_until, enqueued_at)
             VALUES ($1, $2, $3, 0, NULL, $4)",
        )
        .bind(&id)
        .bind(queue)
        .bind(payload)
        .bind(self.now())
        .execute(&self.pool)
        .await
        .map_err(QueueError::from)?;

        debug!(queue, id = %id, "Message published");
        Ok(())
    }
}

#[async_trait]
impl QueueConsumerPort for SqliteQueueBroker {
    async fn receive(&self, queue: &str) -> Result<Option<Delivery>, ApplicationError> {
        let delivery = self.claim(queue).await?;
        if let Some(d) = delivery.as_ref().filter(|d| d.delivery_count > 1) {
            debug!(queue, delivery_id = %d.id, attempt = d.delivery_count, "Redelivering message");
        }
        Ok(delivery)
    }

    #[instrument(skip(self, delivery), fields(queue = %delivery.queue, delivery_id = %delivery.id))]
    async fn ack(&self, delivery: &Delivery) -> Result<(), ApplicationError> {
        let result = sqlx::query(
            "DELETE FROM queue_messages WHERE id = $1 AND queue = $2 AND delivery_count = $3",
        )
        .bind(&delivery.id)
        .bind(&delivery.queue)
        .bind(i64::from(delivery.delivery_count))
        .execute(&self.pool)
        .await
        .map_err(QueueError::from)?;

        if result.rows_affected() == 0 {
            return Err(unknown(delivery).into());
        }
        Ok(())
    }

    #[instrument(skip(self, delivery), fields(queue = %delivery.queue, delivery_id = %delivery.id))]
    async fn reject(&self, delivery: &Delivery, requeue: bool) -> Result<(), ApplicationError> {
        if !requeue {
            self.dead_letter(delivery, REJECTED_REASON).await?;
            warn!(attempt = delivery.delivery_count, "Message dead-lettered");
            return Ok(());
        }

        let result = sqlx::query(
            "UPDATE queue_messages SET locked_until = NULL
             WHERE id = $1 AND queue = $2 AND delivery_count = $3",
        )
        .bind(&delivery.id)
        .bind(&delivery.queue)
        .bind(i64::from(delivery.delivery_count))
        .execute(&self.pool)
        .await
        .map_err(QueueError::from)?;

        if result.rows_affected() == 0 {
            return Err(unknown(delivery).into());
        }
        Ok(())
    }

    async fn stats(&self) -> Result<BTreeMap<String, QueueStats>, ApplicationError> {
        let rows: Vec<(String, i64, i64, i64)> = sqlx::query_as(
            "SELECT q.name,
                    (SELECT COUNT(*) FROM queue_messages m
                     WHERE m.queue = q.name AND (m.locked_until IS NULL OR m.locked_until <= $1)),
                    (SELECT COUNT(*) FROM queue_messages m
                     WHERE m.queue = q.name AND m.locked_until > $1),
                    (SELECT COUNT(*) FROM dead_letters d WHERE d.queue = q.name)
             FROM queues q ORDER BY q.name",
        )
        .bind(self.now())
        .fetch_all(&self.pool)
        .await
        .map_err(QueueError::from)?;

        #[allow(clippy::cast_sign_loss)]
        let stats = rows
            .into_iter()
            .map(|(queue, ready, in_flight, dead)| {
                (queue, QueueStats {
                    ready: ready as u64,
                    in_flight: in_flight as u64,
                    dead_lettered: dead as u64,
                })
            })
            .collect();
        Ok(stats)
    }
}

fn unknown(delivery: &Delivery) -> QueueError {
    QueueError::UnknownDelivery {
        queue: delivery.queue.clone(),
        id: delivery.id.clone(),
    }
}

/// Fixed-width UTC timestamps so lexical order matches time order
fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}
