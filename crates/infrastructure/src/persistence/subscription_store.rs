//! SQLite-backed subscription store

use application::{error::ApplicationError, ports::SubscriptionStorePort};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::{City, EmailAddress, Frequency, Subscription, SubscriptionId, SubscriptionToken};
use sqlx::SqlitePool;
use tracing::{debug, instrument};

use super::error::map_sqlx_error;

const SELECT_COLUMNS: &str =
    "SELECT id, email, city, frequency, token, confirmed, created_at FROM subscriptions";

#[derive(sqlx::FromRow)]
struct SubscriptionRow {
    id: String,
    email: String,
    city: String,
    frequency: String,
    token: String,
    confirmed: bool,
    created_at: String,
}

impl SubscriptionRow {
    fn to_subscription(self) -> Result<Subscription, ApplicationError> {
        let corrupt = |field: &str, e: &dyn std::fmt::Display| {
            ApplicationError::Internal(format!("Corrupt subscription {}: {field}: {e}", self.id))
        };

        Ok(Subscription {
            id: SubscriptionId::parse(&self.id).map_err(|e| corrupt("id", &e))?,
            email: EmailAddress::new(&self.email).map_err(|e| corrupt("email", &e))?,
            city: City::new(&self.city).map_err(|e| corrupt("city", &e))?,
            frequency: self
                .frequency
                .parse::<Frequency>()
                .map_err(|e| corrupt("frequency", &e))?,
            token: SubscriptionToken::from_raw(self.token.clone()),
            confirmed: self.confirmed,
            created_at: DateTime::parse_from_rfc3339(&self.created_at)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| corrupt("created_at", &e))?,
        })
    }
}

/// Subscription store on the shared sqlx pool
#[derive(Clone)]
pub struct SqliteSubscriptionStore {
    pool: SqlitePool,
}

impl std::fmt::Debug for SqliteSubscriptionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteSubscriptionStore")
            .finish_non_exhaustive()
    }
}

impl SqliteSubscriptionStore {
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn fetch_by_token(
        &self,
        token: &SubscriptionToken,
    ) -> Result<Option<Subscription>, ApplicationError> {
        let row: Option<SubscriptionRow> =
            sqlx::query_as(&format!("{SELECT_COLUMNS} WHERE token = $1"))
                .bind(token.as_str())
                .fetch_optional(&self.pool)
                .await
                .map_err(map_sqlx_error)?;

        row.map(SubscriptionRow::to_subscription).transpose()
    }
}

#[async_trait]
impl SubscriptionStorePort for SqliteSubscriptionStore {
    #[instrument(skip(self, subscription), fields(city = %subscription.city, frequency = %subscription.frequency))]
    async fn create(&self, subscription: &Subscription) -> Result<(), ApplicationError> {
        sqlx::query(
            "INSERT INTO subscriptions (id, email, city, frequency, token, confirmed, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(subscription.id.to_string())
        .bind(subscription.email.as_str())
        .bind(subscription.city.as_str())
        .bind(subscription.frequency.as_str())
        .bind(subscription.token.as_str())
        .bind(subscription.confirmed)
        .bind(subscription.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| match map_sqlx_error(e) {
            ApplicationError::AlreadyExists(_) => ApplicationError::AlreadyExists(format!(
                "{} is already subscribed to {} {} forecasts",
                subscription.email, subscription.frequency, subscription.city
            )),
            other => other,
        })?;

        debug!(id = %subscription.id, "Subscription stored");
        Ok(())
    }

    async fn find_by_token(
        &self,
        token: &SubscriptionToken,
    ) -> Result<Option<Subscription>, ApplicationError> {
        self.fetch_by_token(token).await
    }

    #[instrument(skip(self, token))]
    async fn confirm(&self, token: &SubscriptionToken) -> Result<Subscription, ApplicationError> {
        let result = sqlx::query("UPDATE subscriptions SET confirmed = 1 WHERE token = $1")
            .bind(token.as_str())
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(ApplicationError::NotFound(format!(
                "No subscription for token {token}"
            )));
        }

        self.fetch_by_token(token).await?.ok_or_else(|| {
            ApplicationError::NotFound(format!("No subscription for token {token}"))
        })
    }

    #[instrument(skip(self, token))]
    async fn unsubscribe(&self, token: &SubscriptionToken) -> Result<(), ApplicationError> {
        let result = sqlx::query("DELETE FROM subscriptions WHERE token = $1")
            .bind(token.as_str())
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(ApplicationError::NotFound(format!(
                "No subscription for token {token}"
            )));
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_confirmed_by_frequency(
        &self,
        frequency: Frequency,
    ) -> Result<Vec<Subscription>, ApplicationError> {
        let rows: Vec<SubscriptionRow> = sqlx::query_as(&format!(
            "{SELECT_COLUMNS} WHERE frequency = $1 AND confirmed = 1 ORDER BY created_at"
        ))
        .bind(frequency.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.into_iter()
            .map(SubscriptionRow::to_subscription)
            .collect()
    }
}
