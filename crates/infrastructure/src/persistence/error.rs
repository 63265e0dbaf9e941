//! Shared error mapping for the sqlx stores

use application::error::ApplicationError;

/// Map a sqlx error to an application-layer error
///
/// Pool exhaustion and closed pools surface as `ExternalService` so the
/// consumer requeues instead of dead-lettering.
pub fn map_sqlx_error(e: sqlx::Error) -> ApplicationError {
    match e {
        sqlx::Error::RowNotFound => {
            ApplicationError::NotFound("Database record not found".to_string())
        },
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            ApplicationError::AlreadyExists(db_err.message().to_string())
        },
        sqlx::Error::Database(db_err) => {
            ApplicationError::Internal(format!("Database error: {db_err}"))
        },
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            ApplicationError::ExternalService(format!("Database unavailable: {e}"))
        },
        other => ApplicationError::Internal(format!("Database error: {other}")),
    }
}
