//! Application layer - Use cases and orchestration
//!
//! Defines the ports the forecast pipeline depends on and the services that
//! drive it: the per-cadence dispatcher, the queue consumer and the
//! subscription lifecycle.

pub mod error;
pub mod jobs;
pub mod ports;
pub mod services;

pub use error::ApplicationError;
pub use jobs::*;
pub use ports::*;
pub use services::*;
