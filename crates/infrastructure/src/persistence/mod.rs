//! Persistence module
//!
//! SQLite storage through sqlx: the connection pool, migrations and the
//! subscription store.

pub mod async_connection;
mod error;
pub mod subscription_store;

pub use async_connection::{AsyncDatabase, AsyncDatabaseConfig, AsyncDatabaseError};
pub use error::map_sqlx_error;
pub use subscription_store::SqliteSubscriptionStore;
