//! CLI command implementations

use std::sync::Arc;

use anyhow::Result;
use clap::CommandFactory;
use dialoguer::{Confirm, Input};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use crate::catalog::CatalogClient;
use crate::cli::{AuthManager, Cli};
use crate::config::Config;
use crate::download::Downloader;
use crate::server;
use crate::session::{LibrespotSession, StreamingSession};

/// Configure and verify Spotify app credentials
pub async fn auth(
    client_id: Option<String>,
    client_secret: Option<String>,
    force: bool,
) -> Result<()> {
    AuthManager::authenticate(client_id, client_secret, force).await?;
    Ok(())
}

/// Bring up the streaming session and the catalog client
///
/// The two bootstraps are independent and run concurrently; the downloader
/// must not issue requests before both are done.
async fn init() -> Result<(Arc<LibrespotSession>, Arc<CatalogClient>)> {
    let credentials = AuthManager::authenticate(None, None, false).await?;
    let catalog = Arc::new(CatalogClient::new(credentials)?);
    let session = Arc::new(LibrespotSession::new(Config::cache_dir()));

    tokio::try_join!(session.connect(), catalog.authenticate())?;
    Ok((session, catalog))
}

/// Interactive query loop; Ctrl-C or EOF exits and closes the session
pub async fn prompt(config: Config) -> Result<()> {
    let (session, catalog) = init().await?;
    let stream_session: Arc<dyn StreamingSession> = session.clone();
    let downloader = Downloader::new(stream_session, config.clone());

    loop {
        let query: String = match Input::new()
            .with_prompt("Query")
            .allow_empty(true)
            .interact_text()
        {
            Ok(query) => query,
            Err(_) => break,
        };

        let query = query.trim();
        if query.is_empty() {
            continue;
        }

        if let Err(e) = run_query(query, &catalog, &downloader, false).await {
            warn!("Request failed: {:#}", e);
        }
    }

    println!();
    session.close();
    Ok(())
}

/// One-shot download of a single query
pub async fn download(query: String, yes: bool, config: Config) -> Result<()> {
    let (session, catalog) = init().await?;
    let stream_session: Arc<dyn StreamingSession> = session.clone();
    let downloader = Downloader::new(stream_session, config);

    let result = run_query(&query, &catalog, &downloader, yes).await;
    session.close();
    result
}

/// Run the HTTP download endpoint until interrupted
pub async fn serve(port: u16, config: Config) -> Result<()> {
    let (session, catalog) = init().await?;
    let stream_session: Arc<dyn StreamingSession> = session.clone();
    let downloader = Downloader::new(stream_session, config);

    info!("Download server ready.");
    server::serve(catalog, downloader, port).await
}

/// Resolve one query and download the resulting batch
async fn run_query(
    query: &str,
    catalog: &CatalogClient,
    downloader: &Downloader,
    ignore_confirmation: bool,
) -> Result<()> {
    let tracks = catalog.resolve(query).await?;
    if tracks.is_empty() {
        warn!("No tracks found: {}", query);
        return Ok(());
    }

    let progress = ProgressBar::new(tracks.len() as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap()
            .progress_chars("#>-"),
    );

    // An unreadable confirmation prompt counts as a decline
    let confirm = |count: usize| {
        Confirm::new()
            .with_prompt(format!(
                "You are about to download {count} tracks and may be rate limited. Continue?"
            ))
            .default(true)
            .interact()
            .unwrap_or(false)
    };

    let Some(result) = downloader
        .download_batch_confirmed(tracks, ignore_confirmation, confirm, Some(&progress))
        .await
    else {
        progress.finish_and_clear();
        info!("Aborted");
        return Ok(());
    };
    progress.finish_with_message("Batch complete");

    info!(
        "{} downloaded, {} skipped, {} failed",
        result.downloaded(),
        result.skipped(),
        result.failed()
    );
    Ok(())
}

/// Generate shell completions on stdout
pub fn completion(shell: clap_complete::Shell) {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    clap_complete::generate(shell, &mut cmd, name, &mut std::io::stdout());
}
