//! weatherfan binary

use clap::Parser;
use infrastructure::{AppConfig, init_logging};
use presentation_cli::{
    app::App,
    cli::{Cli, log_filter_from_verbosity},
    commands,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load_from(cli.config.as_deref())?;
    if let Some(level) = log_filter_from_verbosity(cli.verbose) {
        level.clone_into(&mut config.logging.level);
    }
    init_logging(&config.logging)?;

    let app = App::new(config).await?;
    let result = commands::run(&app, cli.command).await;
    app.db.close().await;
    result
}
