//! Cron-based scheduler for the forecast fan-out
//!
//! Uses `tokio-cron-scheduler` with six-field cron expressions evaluated in
//! UTC. A task never overlaps itself: a trigger that fires while the
//! previous run is still going is skipped and counted.

mod forecast_tasks;

use std::{
    collections::HashMap,
    future::Future,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use thiserror::Error;
use tokio::sync::Mutex as AsyncMutex;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};
use tracing::{debug, error, info, instrument, warn};

pub use forecast_tasks::{
    DAILY_FORECAST_TASK, HOURLY_FORECAST_TASK, create_forecast_task, register_forecast_tasks,
};

/// Scheduler errors
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("Invalid cron expression: {0}")]
    InvalidCronExpression(String),

    #[error("Task already registered: {0}")]
    DuplicateTask(String),

    #[error("Internal scheduler error: {0}")]
    Internal(String),
}

impl From<JobSchedulerError> for SchedulerError {
    fn from(err: JobSchedulerError) -> Self {
        Self::Internal(err.to_string())
    }
}

/// Default cron expressions
pub mod schedules {
    /// Top of every hour
    pub const HOURLY: &str = "0 0 * * * *";
    /// Every day at 07:00 UTC
    pub const DAILY_7AM: &str = "0 0 7 * * *";
}

/// Snapshot of a task's counters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskStats {
    pub name: String,
    pub cron_expression: String,
    pub running: bool,
    pub success_count: u64,
    pub failure_count: u64,
    /// Triggers dropped because the previous run had not finished
    pub skipped_count: u64,
    pub last_run: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

/// Per-task bookkeeping shared with the job closure
#[derive(Debug)]
struct TaskMetadata {
    name: String,
    cron_expression: String,
    running: AtomicBool,
    success_count: AtomicU64,
    failure_count: AtomicU64,
    skipped_count: AtomicU64,
    last_run: RwLock<Option<DateTime<Utc>>>,
    last_error: RwLock<Option<String>>,
}

/// Clears the running flag even if the task panics
struct Running<'a>(&'a AtomicBool);

impl Drop for Running<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl TaskMetadata {
    fn new(name: String, cron_expression: String) -> Self {
        Self {
            name,
            cron_expression,
            running: AtomicBool::new(false),
            success_count: AtomicU64::new(0),
            failure_count: AtomicU64::new(0),
            skipped_count: AtomicU64::new(0),
            last_run: RwLock::new(None),
            last_error: RwLock::new(None),
        }
    }

    /// Run one trigger unless the previous one is still in progress
    ///
    /// Returns `false` when the trigger was skipped.
    async fn execute<Fut>(&self, task: impl FnOnce() -> Fut) -> bool
    where
        Fut: Future<Output = Result<(), String>>,
    {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            self.skipped_count.fetch_add(1, Ordering::Relaxed);
            warn!(task = %self.name, "Previous run still in progress, skipping trigger");
            return false;
        }
        let _running = Running(&self.running);

        debug!(task = %self.name, "Starting scheduled task");
        let start = std::time::Instant::now();
        let result = task().await;
        let duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
        *self.last_run.write() = Some(Utc::now());

        match result {
            Ok(()) => {
                self.success_count.fetch_add(1, Ordering::Relaxed);
                info!(task = %self.name, duration_ms, "Task completed");
            },
            Err(e) => {
                self.failure_count.fetch_add(1, Ordering::Relaxed);
                error!(task = %self.name, error = %e, duration_ms, "Task failed");
                *self.last_error.write() = Some(e);
            },
        }
        true
    }

    fn to_stats(&self) -> TaskStats {
        TaskStats {
            name: self.name.clone(),
            cron_expression: self.cron_expression.clone(),
            running: self.running.load(Ordering::Acquire),
            success_count: self.success_count.load(Ordering::Relaxed),
            failure_count: self.failure_count.load(Ordering::Relaxed),
            skipped_count: self.skipped_count.load(Ordering::Relaxed),
            last_run: *self.last_run.read(),
            last_error: self.last_error.read().clone(),
        }
    }
}

/// Runs registered tasks on their cron schedules
pub struct TaskScheduler {
    scheduler: AsyncMutex<JobScheduler>,
    tasks: RwLock<HashMap<String, Arc<TaskMetadata>>>,
    running: AtomicBool,
}

impl std::fmt::Debug for TaskScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskScheduler")
            .field("running", &self.running.load(Ordering::Relaxed))
            .field("task_count", &self.tasks.read().len())
            .finish_non_exhaustive()
    }
}

impl TaskScheduler {
    /// Create a stopped scheduler
    pub async fn new() -> Result<Self, SchedulerError> {
        Ok(Self {
            scheduler: AsyncMutex::new(JobScheduler::new().await?),
            tasks: RwLock::new(HashMap::new()),
            running: AtomicBool::new(false),
        })
    }

    #[instrument(skip(self))]
    pub async fn start(&self) -> Result<(), SchedulerError> {
        if self.running.swap(true, Ordering::AcqRel) {
            debug!("Scheduler already running");
            return Ok(());
        }
        self.scheduler.lock().await.start().await?;
        info!(tasks = self.task_count(), "Task scheduler started");
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn stop(&self) -> Result<(), SchedulerError> {
        if !self.running.swap(false, Ordering::AcqRel) {
            debug!("Scheduler already stopped");
            return Ok(());
        }
        self.scheduler.lock().await.shutdown().await?;
        info!("Task scheduler stopped");
        Ok(())
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Register `task` under a unique `name`
    ///
    /// `cron_expression` has six fields: sec min hour day month weekday.
    #[instrument(skip(self, task))]
    pub async fn add_task<F, Fut>(
        &self,
        name: &str,
        cron_expression: &str,
        task: F,
    ) -> Result<(), SchedulerError>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), String>> + Send + 'static,
    {
        cron_expression.parse::<cron::Schedule>().map_err(|e| {
            SchedulerError::InvalidCronExpression(format!("{cron_expression}: {e}"))
        })?;

        let metadata = Arc::new(TaskMetadata::new(
            name.to_string(),
            cron_expression.to_string(),
        ));
        {
            let mut tasks = self.tasks.write();
            if tasks.contains_key(name) {
                return Err(SchedulerError::DuplicateTask(name.to_string()));
            }
            tasks.insert(name.to_string(), Arc::clone(&metadata));
        }

        let task = Arc::new(task);
        let job_metadata = Arc::clone(&metadata);
        let job = Job::new_async(cron_expression, move |_uuid, _lock| {
            let metadata = Arc::clone(&job_metadata);
            let task = Arc::clone(&task);
            Box::pin(async move {
                metadata.execute(|| task()).await;
            })
        });

        let job = match job {
            Ok(job) => job,
            Err(e) => {
                self.tasks.write().remove(name);
                return Err(SchedulerError::InvalidCronExpression(e.to_string()));
            },
        };

        if let Err(e) = self.scheduler.lock().await.add(job).await {
            self.tasks.write().remove(name);
            return Err(e.into());
        }

        info!(task = %name, cron = %cron_expression, "Task scheduled");
        Ok(())
    }

    #[must_use]
    pub fn get_task_stats(&self, name: &str) -> Option<TaskStats> {
        self.tasks.read().get(name).map(|m| m.to_stats())
    }

    /// Stats for every task, sorted by name
    #[must_use]
    pub fn get_all_stats(&self) -> Vec<TaskStats> {
        let mut stats: Vec<TaskStats> = self.tasks.read().values().map(|m| m.to_stats()).collect();
        stats.sort_by(|a, b| a.name.cmp(&b.name));
        stats
    }

    #[must_use]
    pub fn task_count(&self) -> usize {
        self.tasks.read().len()
    }
}
