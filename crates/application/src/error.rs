//! Application-level errors

use domain::DomainError;
use thiserror::Error;

/// Errors that can occur in the application layer
#[derive(Debug, Error)]
pub enum ApplicationError {
    /// Domain-level error
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// No provider could resolve the city
    #[error("City not found: {0}")]
    CityNotFound(String),

    /// External service error (weather upstream, SMTP, broker)
    #[error("External service error: {0}")]
    ExternalService(String),

    /// Entity lookup failed
    #[error("Not found: {0}")]
    NotFound(String),

    /// Unique constraint violated
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// A run for this cadence is still in progress
    #[error("Dispatch already running: {0}")]
    AlreadyRunning(String),

    /// The operation was cancelled before it completed
    #[error("Operation cancelled")]
    Cancelled,

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApplicationError {
    /// Check if this error is retryable
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::ExternalService(_) | Self::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn external_service_is_retryable() {
        assert!(ApplicationError::ExternalService("smtp".into()).is_retryable());
        assert!(!ApplicationError::NotFound("x".into()).is_retryable());
    }

    #[test]
    fn domain_errors_convert() {
        let err: ApplicationError = DomainError::InvalidCity("empty".into()).into();
        assert_eq!(err.to_string(), "Invalid city: empty");
    }
}
