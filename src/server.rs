//! HTTP-triggered download variant
//!
//! `GET /{kind}/{id}` synthesizes the canonical item URL and runs the same
//! pipeline as the interactive prompt, with the batch-size confirmation
//! bypassed. Batches are serialized behind a lock since the streaming
//! session supports one active stream at a time.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::catalog::{CatalogClient, ItemKind, canonical_url};
use crate::download::Downloader;

pub struct ServerState {
    catalog: Arc<CatalogClient>,
    downloader: Downloader,
    batch_lock: Mutex<()>,
}

pub async fn serve(catalog: Arc<CatalogClient>, downloader: Downloader, port: u16) -> Result<()> {
    let state = Arc::new(ServerState {
        catalog,
        downloader,
        batch_lock: Mutex::new(()),
    });

    let app = Router::new()
        .route("/{kind}/{id}", get(download_item))
        .with_state(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Listening on http://{addr}");

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}

async fn download_item(
    Path((kind, id)): Path<(String, String)>,
    State(state): State<Arc<ServerState>>,
) -> (StatusCode, String) {
    let Some(kind) = ItemKind::from_segment(&kind) else {
        return (
            StatusCode::NOT_FOUND,
            format!("unknown item type: {kind}\n"),
        );
    };

    let query = canonical_url(kind, &id);
    info!("Download request for {}", query);

    let tracks = match state.catalog.resolve(&query).await {
        Ok(tracks) => tracks,
        Err(e) => {
            warn!("Resolution failed for {}: {:#}", query, e);
            return (
                StatusCode::BAD_GATEWAY,
                "catalog resolution failed\n".to_string(),
            );
        }
    };
    if tracks.is_empty() {
        return (StatusCode::NOT_FOUND, "no tracks found\n".to_string());
    }

    let _guard = state.batch_lock.lock().await;
    let result = state.downloader.download_batch(tracks, None).await;
    info!(
        "Batch finished: {} downloaded, {} skipped, {} failed",
        result.downloaded(),
        result.skipped(),
        result.failed()
    );

    (StatusCode::OK, "ok\n".to_string())
}
