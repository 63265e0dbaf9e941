//! Outbound notification port
//!
//! Implemented both by the queue publisher (dispatcher side) and by the
//! templated email sender (consumer side).

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use crate::{
    error::ApplicationError,
    jobs::{ConfirmationJob, ForecastJob},
};

#[cfg_attr(test, automock)]
#[async_trait]
pub trait NotificationPort: Send + Sync {
    async fn send_confirmation(&self, job: &ConfirmationJob) -> Result<(), ApplicationError>;

    async fn send_forecast(&self, job: &ForecastJob) -> Result<(), ApplicationError>;
}
