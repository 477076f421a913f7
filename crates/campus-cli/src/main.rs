use anyhow::Result;
use clap::Parser;
use tracing::debug;

use campus_cli::{
    cli::{Cli, Commands},
    commands, logging,
};
use campus_config::{CampusConfig, ConfigOverrides};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let overrides = ConfigOverrides {
        db_path: cli.db_path.clone(),
        log_level: cli.effective_log_level().map(|level| level.as_str().to_string()),
    };
    let config = CampusConfig::load(cli.config.clone(), overrides)?;

    logging::init(&config.logging)?;
    debug!(db = %config.storage.path.display(), "Configuration loaded");

    match cli.command {
        Commands::Tags(cmd) => commands::tags::execute(&config, cli.actor, cmd).await?,
        Commands::Config { json } => commands::config::execute(&config, json)?,
    }

    Ok(())
}
