//! Command-line definition

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use domain::Frequency;

/// Weather forecast fan-out
#[derive(Debug, Parser)]
#[command(name = "weatherfan")]
#[command(author, version, about = "Weather forecast fan-out service", long_about = None)]
pub struct Cli {
    /// Config file (default: ./config.toml if present)
    #[arg(short, long, env = "WEATHERFAN_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Verbosity level, overrides the configured log level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the cron scheduler that triggers hourly and daily fan-outs
    Dispatcher,

    /// Run queue workers that render and send notification emails
    Consumer,

    /// Run one fan-out immediately
    Dispatch {
        #[arg(short, long, value_enum)]
        frequency: FrequencyArg,
    },

    /// Apply pending database migrations
    Migrate,

    /// Create a subscription and queue its confirmation email
    Subscribe {
        email: String,
        city: String,
        #[arg(short, long, value_enum, default_value = "daily")]
        frequency: FrequencyArg,
    },

    /// Confirm a subscription by token
    Confirm { token: String },

    /// Remove a subscription by token
    Unsubscribe { token: String },

    /// Show ready, in-flight and dead-lettered counts per queue
    QueueStats,

    /// List dead-lettered messages of a queue
    DeadLetters { queue: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FrequencyArg {
    Hourly,
    Daily,
}

impl From<FrequencyArg> for Frequency {
    fn from(arg: FrequencyArg) -> Self {
        match arg {
            FrequencyArg::Hourly => Self::Hourly,
            FrequencyArg::Daily => Self::Daily,
        }
    }
}

/// Determine log filter level from verbosity count
pub const fn log_filter_from_verbosity(verbose: u8) -> Option<&'static str> {
    match verbose {
        0 => None,
        1 => Some("info"),
        2 => Some("debug"),
        _ => Some("trace"),
    }
}
