//! CLI module for tunegrab

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub mod auth;
pub mod commands;

pub use auth::AuthManager;

#[derive(Parser, Debug)]
#[command(name = "tunegrab", about = "Download Spotify tracks into a tagged local library")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Root folder for downloaded tracks
    #[arg(short, long, global = true, env = "TUNEGRAB_MUSIC_DIR")]
    pub output: Option<PathBuf>,

    /// Do not open the file manager after a batch
    #[arg(long, global = true)]
    pub no_reveal: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Configure Spotify app credentials
    Auth {
        /// Spotify app client id
        #[arg(long, env = "SPOTIFY_CLIENT_ID")]
        client_id: Option<String>,

        /// Spotify app client secret
        #[arg(long, env = "SPOTIFY_CLIENT_SECRET")]
        client_secret: Option<String>,

        /// Force re-authentication (ignore stored credentials)
        #[arg(long)]
        force: bool,
    },

    /// Interactive query prompt (the default)
    Prompt,

    /// Download one query or item URL and exit
    Download {
        /// Free-text search or an open.spotify.com item URL
        query: String,

        /// Skip the large-batch confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Run the HTTP download endpoint
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "5000")]
        port: u16,
    },

    /// Generate shell completions
    Completion {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
}
