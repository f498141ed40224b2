//! tunegrab - download Spotify tracks into a tagged local library

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod catalog;
mod cli;
mod config;
mod download;
mod server;
mod session;
mod track;
mod utils;

use cli::{Cli, Commands};
use config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        "tunegrab=debug,librespot=info"
    } else {
        "tunegrab=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let mut config = Config::default();
    if let Some(output) = cli.output {
        config.music_dir = output;
    }
    if cli.no_reveal {
        config.reveal_after_download = false;
    }

    match cli.command.unwrap_or(Commands::Prompt) {
        Commands::Auth {
            client_id,
            client_secret,
            force,
        } => {
            cli::commands::auth(client_id, client_secret, force).await?;
        }
        Commands::Prompt => {
            cli::commands::prompt(config).await?;
        }
        Commands::Download { query, yes } => {
            cli::commands::download(query, yes, config).await?;
        }
        Commands::Serve { port } => {
            cli::commands::serve(port, config).await?;
        }
        Commands::Completion { shell } => {
            cli::commands::completion(shell);
        }
    }

    Ok(())
}
