//! Download orchestration and file materialization
//!
//! Processes a resolved batch of tracks strictly sequentially: path
//! computation, skip-if-present, stream acquisition with tier fallback,
//! chunked copy to disk, then best-effort tagging. One track's failure
//! never aborts the batch.

pub mod acquire;
pub mod path;
pub mod tagger;

use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use indicatif::ProgressBar;
use tracing::{info, warn};

use crate::config::Config;
use crate::session::{ByteStream, StreamingSession};
use crate::track::Track;

pub use acquire::{AcquireError, acquire};
pub use path::resolve_path;

const COPY_CHUNK_BYTES: usize = 4096;

/// Per-track result of a batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    Downloaded,
    SkippedExisting,
    Failed(String),
}

/// Ordered per-track outcomes of one batch; preserves input order
#[derive(Debug, Default)]
pub struct BatchResult {
    entries: Vec<(Track, DownloadOutcome)>,
}

impl BatchResult {
    pub fn entries(&self) -> &[(Track, DownloadOutcome)] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn downloaded(&self) -> usize {
        self.count(|outcome| matches!(outcome, DownloadOutcome::Downloaded))
    }

    pub fn skipped(&self) -> usize {
        self.count(|outcome| matches!(outcome, DownloadOutcome::SkippedExisting))
    }

    pub fn failed(&self) -> usize {
        self.count(|outcome| matches!(outcome, DownloadOutcome::Failed(_)))
    }

    fn count(&self, pred: impl Fn(&DownloadOutcome) -> bool) -> usize {
        self.entries
            .iter()
            .filter(|(_, outcome)| pred(outcome))
            .count()
    }

    fn record(&mut self, track: Track, outcome: DownloadOutcome) {
        self.entries.push((track, outcome));
    }
}

/// Sequential batch downloader
pub struct Downloader {
    session: Arc<dyn StreamingSession>,
    config: Config,
    http: reqwest::Client,
}

impl Downloader {
    pub fn new(session: Arc<dyn StreamingSession>, config: Config) -> Self {
        Self {
            session,
            config,
            http: reqwest::Client::new(),
        }
    }

    /// Batches above the configured threshold need an explicit go-ahead
    /// before any work starts, to avoid upstream rate limiting
    pub fn requires_confirmation(&self, track_count: usize) -> bool {
        track_count > self.config.confirm_threshold
    }

    /// Run the confirmation gate, then the batch
    ///
    /// `confirm` is only consulted when the batch size crosses the threshold
    /// and `ignore_confirmation` is unset. A decline returns `None` before
    /// any acquisition or filesystem work happens.
    pub async fn download_batch_confirmed(
        &self,
        tracks: Vec<Track>,
        ignore_confirmation: bool,
        confirm: impl FnOnce(usize) -> bool,
        progress: Option<&ProgressBar>,
    ) -> Option<BatchResult> {
        if !ignore_confirmation
            && self.requires_confirmation(tracks.len())
            && !confirm(tracks.len())
        {
            return None;
        }
        Some(self.download_batch(tracks, progress).await)
    }

    /// Download every track in order, recording one outcome per track
    ///
    /// After the batch, the reveal policy opens the most specific folder
    /// covering everything that was attempted (best-effort).
    pub async fn download_batch(
        &self,
        tracks: Vec<Track>,
        progress: Option<&ProgressBar>,
    ) -> BatchResult {
        let mut result = BatchResult::default();

        for mut track in tracks {
            if let Some(bar) = progress {
                bar.set_message(track.display_name());
            }

            let outcome = self.download_one(&mut track).await;
            match &outcome {
                DownloadOutcome::Downloaded => info!("Successfully downloaded: {}", track),
                DownloadOutcome::SkippedExisting => {
                    info!("\"{}\" already downloaded, skipping", track)
                }
                DownloadOutcome::Failed(reason) => {
                    warn!("Failed to download \"{}\": {}", track, reason)
                }
            }

            if let Some(bar) = progress {
                bar.inc(1);
            }
            result.record(track, outcome);
        }

        if self.config.reveal_after_download && !result.is_empty() {
            let attempted: Vec<Track> = result
                .entries
                .iter()
                .map(|(track, _)| track.clone())
                .collect();
            if let Some(target) = reveal_target(&attempted, &self.config.music_dir) {
                reveal(&target);
            }
        }

        result
    }

    async fn download_one(&self, track: &mut Track) -> DownloadOutcome {
        // Existence is checked by presence only; a corrupted earlier file
        // counts as already downloaded
        let target = resolve_path(&self.config.music_dir, track);
        if target.exists() {
            return DownloadOutcome::SkippedExisting;
        }

        let stream = match acquire(self.session.as_ref(), track, &self.config.retry).await {
            Ok(stream) => stream,
            Err(e) => return DownloadOutcome::Failed(e.to_string()),
        };

        // The extension may have changed during tier fallback
        let target = resolve_path(&self.config.music_dir, track);
        if let Err(e) = write_stream(&target, stream).await {
            return DownloadOutcome::Failed(format!("write error: {e:#}"));
        }

        if track.format.is_taggable() {
            if let Err(e) = tagger::apply_tags(&target, track, &self.http).await {
                warn!("Failed to tag \"{}\": {:#}", track, e);
            }
        } else {
            warn!("Tagging not supported for {} files", track.format);
        }

        DownloadOutcome::Downloaded
    }
}

/// Folder to surface after a batch, judged against the first track
///
/// Same album -> album folder, same primary artist -> artist folder,
/// mixed sources -> the library root above both.
pub fn reveal_target(tracks: &[Track], root: &Path) -> Option<PathBuf> {
    let first = tracks.first()?;
    let album_dir = resolve_path(root, first).parent()?.to_path_buf();

    if tracks.len() == 1 || tracks.iter().all(|track| track.album == first.album) {
        return Some(album_dir);
    }
    if tracks
        .iter()
        .all(|track| track.primary_artist() == first.primary_artist())
    {
        return album_dir.parent().map(Path::to_path_buf);
    }
    album_dir.parent()?.parent().map(Path::to_path_buf)
}

/// Open a folder in the system file manager; never fails the batch
fn reveal(path: &Path) {
    let Some(rendered) = path.to_str() else {
        warn!("Cannot open non-UTF-8 path {}", path.display());
        return;
    };
    if let Err(e) = webbrowser::open(rendered) {
        warn!("Could not open {}: {}", path.display(), e);
    }
}

async fn write_stream(target: &Path, stream: ByteStream) -> Result<u64> {
    if let Some(parent) = target.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let target = target.to_path_buf();
    tokio::task::spawn_blocking(move || copy_stream_to_file(&target, stream))
        .await
        .context("Download write task panicked")?
}

fn copy_stream_to_file(path: &Path, stream: ByteStream) -> Result<u64> {
    match try_copy(path, stream) {
        Ok(written) => Ok(written),
        Err(e) => {
            // Remove the partial file; presence at this path means success
            let _ = std::fs::remove_file(path);
            Err(e)
        }
    }
}

fn try_copy(path: &Path, mut stream: ByteStream) -> Result<u64> {
    let mut file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;

    let mut buffer = [0u8; COPY_CHUNK_BYTES];
    let mut written = 0u64;
    loop {
        let read = stream.read(&mut buffer).context("Stream read failed")?;
        if read == 0 {
            break;
        }
        file.write_all(&buffer[..read])
            .with_context(|| format!("Failed to write {}", path.display()))?;
        written += read as u64;
    }

    file.flush().context("Failed to flush file")?;
    Ok(written)
}
