//! SQLite connection pool
//!
//! Every store in this crate shares one sqlx pool. Schema changes live as SQL
//! files in the workspace `migrations/` directory and are applied with
//! [`AsyncDatabase::migrate`].

use std::{path::Path, str::FromStr};

use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};
use tracing::{debug, info, instrument};

/// Error type for database setup
#[derive(Debug, thiserror::Error)]
pub enum AsyncDatabaseError {
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Pool settings
#[derive(Debug, Clone)]
pub struct AsyncDatabaseConfig {
    /// Database URL (e.g., "sqlite:weatherfan.db" or "sqlite::memory:")
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    /// Write-ahead logging; ignored for in-memory databases
    pub wal_mode: bool,
}

impl Default for AsyncDatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite:weatherfan.db".to_string(),
            max_connections: 5,
            min_connections: 1,
            wal_mode: true,
        }
    }
}

impl AsyncDatabaseConfig {
    /// In-memory database for tests
    ///
    /// A single connection, since each connection to `:memory:` would see
    /// its own empty database.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            min_connections: 1,
            wal_mode: false,
        }
    }

    /// File-backed database at `path`
    #[must_use]
    pub fn file(path: impl AsRef<Path>) -> Self {
        Self {
            url: format!("sqlite:{}", path.as_ref().display()),
            ..Default::default()
        }
    }

    fn is_memory(&self) -> bool {
        self.url.contains(":memory:")
    }
}

/// Shared sqlx pool
#[derive(Debug, Clone)]
pub struct AsyncDatabase {
    pool: SqlitePool,
}

impl AsyncDatabase {
    /// Open the pool and apply connection pragmas
    #[instrument(skip_all, fields(url = %config.url))]
    pub async fn new(config: &AsyncDatabaseConfig) -> Result<Self, AsyncDatabaseError> {
        if config.max_connections == 0 {
            return Err(AsyncDatabaseError::Config(
                "max_connections must be at least 1".to_string(),
            ));
        }

        let options = SqliteConnectOptions::from_str(&config.url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections.min(config.max_connections))
            .connect_with(options)
            .await?;

        let wal = config.wal_mode && !config.is_memory();
        if wal {
            sqlx::query("PRAGMA journal_mode=WAL")
                .execute(&pool)
                .await?;
            sqlx::query("PRAGMA synchronous=NORMAL")
                .execute(&pool)
                .await?;
            debug!("WAL mode enabled");
        }

        // Workers and the dispatcher write concurrently
        sqlx::query("PRAGMA busy_timeout=5000")
            .execute(&pool)
            .await?;

        info!(
            max_connections = config.max_connections,
            wal,
            "Database pool created"
        );

        Ok(Self { pool })
    }

    /// In-memory database for tests
    pub async fn in_memory() -> Result<Self, AsyncDatabaseError> {
        Self::new(&AsyncDatabaseConfig::in_memory()).await
    }

    #[must_use]
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Apply pending migrations
    #[instrument(skip(self))]
    pub async fn migrate(&self) -> Result<(), AsyncDatabaseError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        info!("Database migrations completed");
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
        debug!("Database pool closed");
    }
}
