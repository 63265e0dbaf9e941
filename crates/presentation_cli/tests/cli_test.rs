//! Command parsing tests

#![allow(clippy::panic, clippy::unwrap_used)]

use clap::Parser;
use presentation_cli::cli::{Cli, Commands, FrequencyArg};

fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
    Cli::try_parse_from(args)
}

#[test]
fn daemons_take_no_arguments() {
    assert!(matches!(
        parse(&["weatherfan", "dispatcher"]).unwrap().command,
        Commands::Dispatcher
    ));
    assert!(matches!(
        parse(&["weatherfan", "consumer"]).unwrap().command,
        Commands::Consumer
    ));
}

#[test]
fn dispatch_requires_frequency() {
    assert!(parse(&["weatherfan", "dispatch"]).is_err());
    assert!(parse(&["weatherfan", "dispatch", "--frequency", "weekly"]).is_err());

    match parse(&["weatherfan", "dispatch", "-f", "hourly"]).unwrap().command {
        Commands::Dispatch { frequency } => assert_eq!(frequency, FrequencyArg::Hourly),
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn subscribe_defaults_to_daily() {
    match parse(&["weatherfan", "subscribe", "anna@example.com", "Kyiv"])
        .unwrap()
        .command
    {
        Commands::Subscribe {
            email,
            city,
            frequency,
        } => {
            assert_eq!(email, "anna@example.com");
            assert_eq!(city, "Kyiv");
            assert_eq!(frequency, FrequencyArg::Daily);
        },
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn global_flags_work_after_subcommand() {
    let cli = parse(&["weatherfan", "queue-stats", "-vv", "--config", "/etc/weatherfan.toml"])
        .unwrap();
    assert_eq!(cli.verbose, 2);
    assert_eq!(
        cli.config.as_deref(),
        Some(std::path::Path::new("/etc/weatherfan.toml"))
    );
    assert!(matches!(cli.command, Commands::QueueStats));
}

#[test]
fn token_commands() {
    match parse(&["weatherfan", "confirm", "abc123"]).unwrap().command {
        Commands::Confirm { token } => assert_eq!(token, "abc123"),
        other => panic!("unexpected command: {other:?}"),
    }
    match parse(&["weatherfan", "unsubscribe", "abc123"]).unwrap().command {
        Commands::Unsubscribe { token } => assert_eq!(token, "abc123"),
        other => panic!("unexpected command: {other:?}"),
    }
    match parse(&["weatherfan", "dead-letters", "email.confirmation"])
        .unwrap()
        .command
    {
        Commands::DeadLetters { queue } => assert_eq!(queue, "email.confirmation"),
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn missing_subcommand_is_an_error() {
    assert!(parse(&["weatherfan"]).is_err());
}
