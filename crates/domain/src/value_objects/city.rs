//! City name as entered by the subscriber

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

const MAX_CITY_LEN: usize = 100;

/// A non-empty city name, trimmed but otherwise kept as the subscriber typed it
///
/// Providers receive the name verbatim; escaping is left to the HTTP transport.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct City(String);

impl City {
    /// Create a validated city name
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidCity` for blank names, names longer than
    /// 100 characters, or names containing control characters.
    pub fn new(name: impl Into<String>) -> Result<Self, DomainError> {
        let name = name.into();
        let trimmed = name.trim();

        if trimmed.is_empty() {
            return Err(DomainError::InvalidCity("city must not be empty".into()));
        }
        if trimmed.chars().count() > MAX_CITY_LEN {
            return Err(DomainError::InvalidCity(format!(
                "city must be at most {MAX_CITY_LEN} characters"
            )));
        }
        if trimmed.chars().any(char::is_control) {
            return Err(DomainError::InvalidCity(
                "city must not contain control characters".into(),
            ));
        }

        Ok(Self(trimmed.to_string()))
    }

    /// Get the city name
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Lowercased form used when building cache keys
    #[must_use]
    pub fn cache_key_part(&self) -> String {
        self.0.to_lowercase()
    }
}

impl fmt::Display for City {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for City {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for City {
    type Error = DomainError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<City> for String {
    fn from(city: City) -> Self {
        city.0
    }
}
