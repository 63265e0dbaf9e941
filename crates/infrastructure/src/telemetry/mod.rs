//! Structured logging and the Prometheus exporter
//!
//! `RUST_LOG` wins over the configured level when set.

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;
use thiserror::Error;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{LoggingConfig, MetricsConfig};

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("Invalid log filter '{filter}': {reason}")]
    Filter { filter: String, reason: String },

    #[error("Failed to initialize logging: {0}")]
    Init(String),

    #[error("Failed to install metrics exporter: {0}")]
    Metrics(String),
}

/// Filter from `RUST_LOG`, falling back to `config.level`
pub fn build_filter(config: &LoggingConfig) -> Result<EnvFilter, TelemetryError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(&config.level).map_err(|e| TelemetryError::Filter {
        filter: config.level.clone(),
        reason: e.to_string(),
    })
}

/// Install the global subscriber
///
/// Fails if a subscriber is already installed.
pub fn init_logging(config: &LoggingConfig) -> Result<(), TelemetryError> {
    let filter = build_filter(config)?;
    let registry = tracing_subscriber::registry().with(filter);

    let result = if config.json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_target(true),
            )
            .try_init()
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .try_init()
    };
    result.map_err(|e| TelemetryError::Init(e.to_string()))?;

    info!(level = %config.level, json = config.json, "Logging initialized");
    Ok(())
}

/// Install the global metrics recorder and serve it on `config.listen`
///
/// Does nothing when disabled. Must be called inside a Tokio runtime.
pub fn init_metrics(config: &MetricsConfig) -> Result<(), TelemetryError> {
    if !config.enabled {
        return Ok(());
    }

    let addr: SocketAddr = config
        .listen
        .parse()
        .map_err(|e| TelemetryError::Metrics(format!("{}: {e}", config.listen)))?;
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| TelemetryError::Metrics(e.to_string()))?;

    info!(listen = %addr, "Metrics exporter listening");
    Ok(())
}
