//! Subcommand handlers

#![allow(clippy::print_stdout)]

use anyhow::Context;
use application::ports::QueueConsumerPort;
use domain::Frequency;
use infrastructure::{
    init_metrics,
    scheduler::{TaskScheduler, register_forecast_tasks},
};
use tracing::{info, warn};

use crate::{app::App, cli::Commands, shutdown::cancel_on_shutdown};

/// Run `command` against a wired application
pub async fn run(app: &App, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Dispatcher => run_dispatcher(app).await,
        Commands::Consumer => run_consumer(app).await,
        Commands::Dispatch { frequency } => dispatch_once(app, frequency.into()).await,
        Commands::Migrate => {
            app.db.migrate().await.context("running migrations")?;
            println!("✅ Migrations applied");
            Ok(())
        },
        Commands::Subscribe {
            email,
            city,
            frequency,
        } => {
            let sub = app
                .subscription_service()
                .subscribe(&email, &city, frequency.into())
                .await?;
            println!("📬 Subscribed {} to {} {} forecasts", sub.email, sub.frequency, sub.city);
            println!("   token: {}", sub.token);
            Ok(())
        },
        Commands::Confirm { token } => {
            let sub = app.subscription_service().confirm(&token).await?;
            println!("✅ Confirmed {} for {} ({})", sub.email, sub.city, sub.frequency);
            Ok(())
        },
        Commands::Unsubscribe { token } => {
            app.subscription_service().unsubscribe(&token).await?;
            println!("👋 Unsubscribed");
            Ok(())
        },
        Commands::QueueStats => queue_stats(app).await,
        Commands::DeadLetters { queue } => dead_letters(app, &queue).await,
    }
}

async fn run_dispatcher(app: &App) -> anyhow::Result<()> {
    let schedule = &app.config.scheduler;
    if !schedule.enabled {
        warn!("Scheduler disabled in configuration, nothing to run");
        return Ok(());
    }

    init_metrics(&app.config.metrics)?;
    let dispatcher = app.forecast_dispatcher()?;
    let cancel = cancel_on_shutdown();
    let scheduler = TaskScheduler::new().await?;
    register_forecast_tasks(
        &scheduler,
        &dispatcher,
        &schedule.hourly_cron,
        &schedule.daily_cron,
        &cancel,
    )
    .await?;
    scheduler.start().await?;

    cancel.cancelled().await;
    scheduler.stop().await?;

    for stats in scheduler.get_all_stats() {
        info!(
            task = %stats.name,
            success = stats.success_count,
            failure = stats.failure_count,
            skipped = stats.skipped_count,
            "Task totals"
        );
    }
    Ok(())
}

async fn run_consumer(app: &App) -> anyhow::Result<()> {
    init_metrics(&app.config.metrics)?;
    let consumer = app.notification_consumer()?;
    consumer.run(cancel_on_shutdown()).await;
    info!("Consumer stopped");
    Ok(())
}

async fn dispatch_once(app: &App, frequency: Frequency) -> anyhow::Result<()> {
    let dispatcher = app.forecast_dispatcher()?;
    let report = dispatcher.dispatch(frequency, &cancel_on_shutdown()).await?;

    println!("🌤  {frequency} dispatch");
    println!("   subscriptions: {}", report.subscriptions);
    println!(
        "   cities:        {} ({} failed)",
        report.cities, report.cities_failed
    );
    println!(
        "   notifications: {} queued, {} failed",
        report.notifications_sent, report.notifications_failed
    );
    Ok(())
}

async fn queue_stats(app: &App) -> anyhow::Result<()> {
    let stats = app.broker.stats().await?;
    println!("{:<24} {:>8} {:>10} {:>6}", "QUEUE", "READY", "IN-FLIGHT", "DEAD");
    for (queue, s) in stats {
        println!(
            "{queue:<24} {:>8} {:>10} {:>6}",
            s.ready, s.in_flight, s.dead_lettered
        );
    }
    Ok(())
}

async fn dead_letters(app: &App, queue: &str) -> anyhow::Result<()> {
    let dead = app.broker.dead_letters(queue).await?;
    if dead.is_empty() {
        println!("No dead letters in {queue}");
        return Ok(());
    }
    for letter in dead {
        println!(
            "{} attempts={} at={} reason={}",
            letter.id, letter.delivery_count, letter.dead_lettered_at, letter.reason
        );
        println!("   {}", String::from_utf8_lossy(&letter.payload));
    }
    Ok(())
}
