//! Subscription entity - a confirmed or pending request for periodic forecasts

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::value_objects::{City, EmailAddress, Frequency, SubscriptionId};

/// Opaque token used in confirm and unsubscribe links
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriptionToken(String);

impl SubscriptionToken {
    /// Derive the token for an (email, city, frequency) triple
    ///
    /// Hex-encoded SHA-256 of the three values concatenated, so the same triple
    /// always maps to the same token.
    pub fn derive(email: &EmailAddress, city: &City, frequency: Frequency) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(email.as_str().as_bytes());
        hasher.update(city.as_str().as_bytes());
        hasher.update(frequency.as_str().as_bytes());
        Self(hex::encode(hasher.finalize()))
    }

    /// Wrap a token received from a link
    pub fn from_raw(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubscriptionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A subscriber's request for forecasts of one city at one cadence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: SubscriptionId,
    pub email: EmailAddress,
    pub city: City,
    pub frequency: Frequency,
    pub token: SubscriptionToken,
    /// Only confirmed subscriptions receive forecasts
    pub confirmed: bool,
    pub created_at: DateTime<Utc>,
}

impl Subscription {
    /// Create an unconfirmed subscription
    pub fn new(email: EmailAddress, city: City, frequency: Frequency, now: DateTime<Utc>) -> Self {
        let token = SubscriptionToken::derive(&email, &city, frequency);
        Self {
            id: SubscriptionId::new(),
            email,
            city,
            frequency,
            token,
            confirmed: false,
            created_at: now,
        }
    }

    /// Mark the subscription as confirmed
    pub fn confirm(&mut self) {
        self.confirmed = true;
    }

    /// `{base_url}/api/confirm/{token}`
    #[must_use]
    pub fn confirmation_link(&self, base_url: &str) -> String {
        format!("{}/api/confirm/{}", base_url.trim_end_matches('/'), self.token)
    }

    /// `{base_url}/api/unsubscribe/{token}`
    #[must_use]
    pub fn unsubscribe_link(&self, base_url: &str) -> String {
        format!(
            "{}/api/unsubscribe/{}",
            base_url.trim_end_matches('/'),
            self.token
        )
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn subscription() -> Subscription {
        Subscription::new(
            EmailAddress::new("a@x.com").unwrap(),
            City::new("Kyiv").unwrap(),
            Frequency::Daily,
            Utc.with_ymd_and_hms(2025, 5, 17, 7, 0, 0).unwrap(),
        )
    }

    #[test]
    fn new_subscription_is_unconfirmed() {
        let sub = subscription();
        assert!(!sub.confirmed);
    }

    #[test]
    fn confirm_sets_flag() {
        let mut sub = subscription();
        sub.confirm();
        assert!(sub.confirmed);
    }

    #[test]
    fn token_is_hex_sha256_of_triple() {
        let sub = subscription();
        let expected = hex::encode(Sha256::digest(b"a@x.comKyivdaily"));
        assert_eq!(sub.token.as_str(), expected);
        assert_eq!(sub.token.as_str().len(), 64);
    }

    #[test]
    fn token_differs_by_frequency() {
        let email = EmailAddress::new("a@x.com").unwrap();
        let city = City::new("Kyiv").unwrap();
        assert_ne!(
            SubscriptionToken::derive(&email, &city, Frequency::Daily),
            SubscriptionToken::derive(&email, &city, Frequency::Hourly)
        );
    }

    #[test]
    fn links_embed_token() {
        let sub = subscription();
        assert_eq!(
            sub.unsubscribe_link("https://weather.example/"),
            format!("https://weather.example/api/unsubscribe/{}", sub.token)
        );
        assert_eq!(
            sub.confirmation_link("https://weather.example"),
            format!("https://weather.example/api/confirm/{}", sub.token)
        );
    }
}
