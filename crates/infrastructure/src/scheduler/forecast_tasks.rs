//! Task closures that drive the forecast dispatcher from the scheduler

use std::sync::Arc;

use application::{error::ApplicationError, services::ForecastDispatcher};
use domain::Frequency;
use futures::future::BoxFuture;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use super::{SchedulerError, TaskScheduler};

/// Task name for the hourly cadence
pub const HOURLY_FORECAST_TASK: &str = "hourly_forecast";
/// Task name for the daily cadence
pub const DAILY_FORECAST_TASK: &str = "daily_forecast";

/// Build the closure that runs one dispatch for `frequency`
///
/// A dispatch that is refused because another run of the same cadence is in
/// progress counts as success; the scheduler already records the overlap.
pub fn create_forecast_task(
    dispatcher: Arc<ForecastDispatcher>,
    frequency: Frequency,
    cancel: CancellationToken,
) -> impl Fn() -> BoxFuture<'static, Result<(), String>> + Send + Sync + 'static {
    move || {
        let dispatcher = Arc::clone(&dispatcher);
        let cancel = cancel.clone();

        Box::pin(async move {
            match dispatcher.dispatch(frequency, &cancel).await {
                Ok(_) => Ok(()),
                Err(ApplicationError::AlreadyRunning(_)) => {
                    warn!(frequency = %frequency, "Forecast dispatch already running");
                    Ok(())
                },
                Err(e) => Err(format!("{frequency} forecast dispatch failed: {e}")),
            }
        })
    }
}

/// Register the hourly and daily forecast tasks
pub async fn register_forecast_tasks(
    scheduler: &TaskScheduler,
    dispatcher: &Arc<ForecastDispatcher>,
    hourly_cron: &str,
    daily_cron: &str,
    cancel: &CancellationToken,
) -> Result<(), SchedulerError> {
    scheduler
        .add_task(
            HOURLY_FORECAST_TASK,
            hourly_cron,
            create_forecast_task(Arc::clone(dispatcher), Frequency::Hourly, cancel.clone()),
        )
        .await?;
    scheduler
        .add_task(
            DAILY_FORECAST_TASK,
            daily_cron,
            create_forecast_task(Arc::clone(dispatcher), Frequency::Daily, cancel.clone()),
        )
        .await?;
    Ok(())
}
