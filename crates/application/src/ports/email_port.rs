//! Email sending port

use async_trait::async_trait;
use domain::{DomainError, EmailAddress};
#[cfg(test)]
use mockall::automock;

use crate::error::ApplicationError;

/// A rendered email ready to send
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub to: EmailAddress,
    pub subject: String,
    pub html_body: String,
}

impl OutgoingEmail {
    /// Build an email, rejecting an empty subject or body
    ///
    /// # Errors
    ///
    /// Returns `DomainError::ValidationError` naming the missing field.
    pub fn new(
        to: EmailAddress,
        subject: impl Into<String>,
        html_body: impl Into<String>,
    ) -> Result<Self, DomainError> {
        let subject = subject.into();
        let html_body = html_body.into();

        if subject.trim().is_empty() {
            return Err(DomainError::ValidationError("subject is required".into()));
        }
        if html_body.trim().is_empty() {
            return Err(DomainError::ValidationError("body is required".into()));
        }

        Ok(Self {
            to,
            subject,
            html_body,
        })
    }
}

/// Port for delivering a rendered email
#[cfg_attr(test, automock)]
#[async_trait]
pub trait EmailSenderPort: Send + Sync {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), ApplicationError>;
}
