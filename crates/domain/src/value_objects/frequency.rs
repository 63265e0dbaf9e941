//! Forecast cadence

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

/// How often a subscriber receives a forecast
///
/// Stored and transmitted as the literal strings `hourly` and `daily`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    /// Current conditions, sent at the top of every hour
    Hourly,
    /// Six-slot day outlook, sent once a day
    Daily,
}

impl Frequency {
    /// All cadences, in scheduling order
    pub const ALL: [Self; 2] = [Self::Hourly, Self::Daily];

    /// The wire/storage representation
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Hourly => "hourly",
            Self::Daily => "daily",
        }
    }

    /// `strftime` pattern used for the date line of a forecast email
    #[must_use]
    pub const fn date_format(&self) -> &'static str {
        match self {
            Self::Hourly => "%Y-%m-%d %H:%M:%S",
            Self::Daily => "%Y-%m-%d",
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Frequency {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hourly" => Ok(Self::Hourly),
            "daily" => Ok(Self::Daily),
            other => Err(DomainError::InvalidFrequency(other.to_string())),
        }
    }
}
