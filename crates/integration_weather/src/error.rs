//! Weather provider errors

use thiserror::Error;

/// Weather provider errors
///
/// Every variant triggers fallback inside a [`crate::ProviderChain`]; the
/// distinction only matters for logging and for the error the caller sees
/// once the chain is exhausted.
#[derive(Debug, Error)]
pub enum WeatherError {
    /// The upstream recognised the request but does not know the location
    #[error("{provider}: city not found: {city}")]
    CityNotFound { provider: &'static str, city: String },

    /// Non-success status, upstream error payload or undecodable body
    #[error("{provider}: upstream data error: {message}")]
    UpstreamData {
        provider: &'static str,
        message: String,
    },

    /// Network failure or timeout
    #[error("{provider}: transport error: {message}")]
    Transport {
        provider: &'static str,
        message: String,
    },

    /// HTTP client could not be constructed or a URL could not be built
    #[error("Client configuration error: {0}")]
    Configuration(String),

    /// A chain was built without providers
    #[error("Provider chain requires at least one provider")]
    EmptyChain,
}

impl WeatherError {
    pub(crate) fn upstream(provider: &'static str, message: impl Into<String>) -> Self {
        Self::UpstreamData {
            provider,
            message: message.into(),
        }
    }

    pub(crate) fn transport(provider: &'static str, err: &reqwest::Error) -> Self {
        Self::Transport {
            provider,
            message: err.to_string(),
        }
    }

    /// Whether the upstream reported the location as unknown
    pub const fn is_city_not_found(&self) -> bool {
        matches!(self, Self::CityNotFound { .. })
    }
}
