mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use sharebox::config::Config;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let cli = Cli::parse();

    let config = match cli.config {
        Some(path) => Config::load_from_path(path)?,
        None => Config::load()?,
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.verbosity.as_directive()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Share(args) => commands::share(&config, &args.uri).await?,
        Commands::ShareText(args) => {
            commands::share_text(&config, args.content, args.content_type).await?
        }
        Commands::Receive(args) => commands::receive(&config, args.follow).await?,
        Commands::Group => commands::group(&config)?,
        Commands::Provision => commands::provision(&config)?,
    }

    Ok(())
}
