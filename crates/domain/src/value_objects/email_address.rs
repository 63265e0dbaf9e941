//! Subscriber email address
//!
//! ```
//! use domain::EmailAddress;
//!
//! let email = EmailAddress::new(" Reader@Example.COM ").unwrap();
//! assert_eq!(email.as_str(), "reader@example.com");
//! assert!(EmailAddress::new("not-an-address").is_err());
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::errors::DomainError;

/// A validated, lowercase email address
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Validate)]
#[serde(try_from = "String", into = "String")]
pub struct EmailAddress {
    #[validate(email)]
    value: String,
}

impl EmailAddress {
    /// Create a new email address, validating the format
    ///
    /// # Errors
    ///
    /// Returns an error if the email format is invalid.
    pub fn new(email: impl Into<String>) -> Result<Self, DomainError> {
        let value = email.into().trim().to_lowercase();

        let candidate = Self { value };
        candidate
            .validate()
            .map_err(|e| DomainError::InvalidEmailAddress(e.to_string()))?;

        Ok(candidate)
    }

    /// Get the email address as a string slice
    pub fn as_str(&self) -> &str {
        &self.value
    }
}

impl fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

impl TryFrom<String> for EmailAddress {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for EmailAddress {
    type Error = DomainError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<EmailAddress> for String {
    fn from(email: EmailAddress) -> Self {
        email.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_email_is_accepted() {
        let email = EmailAddress::new("a@x.com").unwrap();
        assert_eq!(email.as_str(), "a@x.com");
    }

    #[test]
    fn email_is_trimmed_and_lowercased() {
        let email = EmailAddress::new("  B@X.Com ").unwrap();
        assert_eq!(email.to_string(), "b@x.com");
    }

    #[test]
    fn missing_at_sign_is_rejected() {
        assert!(matches!(
            EmailAddress::new("nobody"),
            Err(DomainError::InvalidEmailAddress(_))
        ));
    }

    #[test]
    fn deserialization_validates() {
        let ok: Result<EmailAddress, _> = serde_json::from_str("\"c@x.com\"");
        assert!(ok.is_ok());

        let bad: Result<EmailAddress, _> = serde_json::from_str("\"garbage\"");
        assert!(bad.is_err());
    }

    #[test]
    fn serializes_as_plain_string() {
        let email = EmailAddress::new("c@x.com").unwrap();
        assert_eq!(serde_json::to_string(&email).unwrap(), "\"c@x.com\"");
    }
}
