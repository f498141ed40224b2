//! Metadata and cover-art embedding for finished downloads

use std::path::Path;

use anyhow::{Context, Result};
use lofty::config::WriteOptions;
use lofty::picture::{MimeType, Picture, PictureType};
use lofty::prelude::*;
use lofty::probe::Probe;
use lofty::tag::ItemKey;
use reqwest::Client;
use tracing::debug;

const COVER_DESCRIPTION: &str = "Cover";

/// Write the track's metadata and cover art into the file at `path`
///
/// The cover is fetched over HTTP first (non-2xx is an error); the lofty
/// write runs on the blocking pool. Errors are propagated to the caller,
/// which treats tagging as best-effort.
pub async fn apply_tags(path: &Path, track: &crate::track::Track, http: &Client) -> Result<()> {
    let cover = match &track.cover_url {
        Some(url) => Some(fetch_cover(http, url).await?),
        None => None,
    };

    let path = path.to_path_buf();
    let track = track.clone();
    tokio::task::spawn_blocking(move || write_tags(&path, &track, cover))
        .await
        .context("Tag writing task panicked")?
}

async fn fetch_cover(http: &Client, url: &str) -> Result<Vec<u8>> {
    let response = http
        .get(url)
        .send()
        .await
        .context("Failed to fetch cover art")?
        .error_for_status()
        .context("Cover art request failed")?;

    let bytes = response
        .bytes()
        .await
        .context("Failed to read cover art body")?;
    Ok(bytes.to_vec())
}

fn write_tags(path: &Path, track: &crate::track::Track, cover: Option<Vec<u8>>) -> Result<()> {
    let mut tagged_file = Probe::open(path)
        .context("Failed to open audio file")?
        .read()
        .context("Failed to read audio file tags")?;

    let tag = match tagged_file.primary_tag_mut() {
        Some(tag) => tag,
        None => {
            if let Some(tag) = tagged_file.first_tag_mut() {
                tag
            } else {
                let tag_type = tagged_file.primary_tag_type();
                tagged_file.insert_tag(lofty::tag::Tag::new(tag_type));
                tagged_file
                    .primary_tag_mut()
                    .context("Failed to create tag")?
            }
        }
    };

    tag.set_title(track.title.clone());
    tag.set_artist(track.artist.clone());
    tag.set_album(track.album.clone());
    tag.set_track(track.track_number);
    tag.set_disk(track.disc_number);
    if !track.date.is_empty() {
        tag.insert_text(ItemKey::RecordingDate, track.date.clone());
    }

    if let Some(cover) = cover {
        let picture = Picture::new_unchecked(
            PictureType::CoverFront,
            Some(MimeType::Jpeg),
            Some(COVER_DESCRIPTION.to_string()),
            cover,
        );
        tag.remove_picture_type(PictureType::CoverFront);
        tag.push_picture(picture);
    }

    tagged_file
        .save_to_path(path, WriteOptions::default())
        .context("Failed to save tags")?;

    debug!("Tagged {}", path.display());
    Ok(())
}
