//! Query resolution: free text or item URL into track descriptors

use anyhow::Result;
use tracing::debug;
use url::Url;

use super::client::CatalogClient;
use super::models::{AlbumWithTracks, TrackObject};
use crate::track::Track;

const OPEN_BASE_URL: &str = "https://open.spotify.com";
const ITEM_ID_LEN: usize = 22;

/// Kind of catalog item a URL points at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    Track,
    Album,
    Playlist,
    Artist,
}

impl ItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Track => "track",
            ItemKind::Album => "album",
            ItemKind::Playlist => "playlist",
            ItemKind::Artist => "artist",
        }
    }

    pub fn from_segment(segment: &str) -> Option<Self> {
        match segment {
            "track" => Some(ItemKind::Track),
            "album" => Some(ItemKind::Album),
            "playlist" => Some(ItemKind::Playlist),
            "artist" => Some(ItemKind::Artist),
            _ => None,
        }
    }
}

/// Canonical public URL of an item
pub fn canonical_url(kind: ItemKind, id: &str) -> String {
    format!("{OPEN_BASE_URL}/{}/{}", kind.as_str(), id)
}

/// Parse a catalog item URL, tolerating the optional `intl-xx` path segment
///
/// Returns `None` for anything that is not a well-formed item URL, in which
/// case the input is treated as a search query.
pub fn parse_item_url(raw: &str) -> Option<(ItemKind, String)> {
    let url = Url::parse(raw).ok()?;
    let host = url.host_str()?;
    if !host.ends_with("open.spotify.com") {
        return None;
    }

    let mut segments = url.path_segments()?.filter(|s| !s.is_empty());
    let mut first = segments.next()?;
    if first.starts_with("intl-") {
        first = segments.next()?;
    }

    let kind = ItemKind::from_segment(first)?;
    let id = segments.next()?;
    if id.len() != ITEM_ID_LEN || !id.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }

    Some((kind, id.to_string()))
}

/// Album fields shared by every track of an album download
struct AlbumContext {
    name: String,
    cover_url: Option<String>,
    date: String,
}

impl From<&AlbumWithTracks> for AlbumContext {
    fn from(album: &AlbumWithTracks) -> Self {
        Self {
            name: album.name.clone(),
            cover_url: album.images.first().map(|image| image.url.clone()),
            date: album.release_date.clone().unwrap_or_default(),
        }
    }
}

/// Build a descriptor from an API track object
///
/// `album` overrides the embedded album data when the track came from an
/// album endpoint (simplified objects carry no album of their own).
/// Returns `None` for items without an id (e.g. podcast episodes inside
/// playlists).
fn track_from_api(api: TrackObject, album: Option<&AlbumContext>) -> Option<Track> {
    let id = api.id?;

    let mut track = Track::new(&id);
    track.source_url = Some(canonical_url(ItemKind::Track, &id));
    if !api.name.trim().is_empty() {
        track.title = api.name;
    }
    track.duration_secs = ((api.duration_ms as f64) / 1000.0).round() as u32;
    track.track_number = api.track_number.unwrap_or(1).max(1);
    track.disc_number = api.disc_number.unwrap_or(1).max(1);
    track.set_artists(api.artists.into_iter().map(|artist| artist.name).collect());

    if let Some(context) = album {
        track.album = context.name.clone();
        track.cover_url = context.cover_url.clone();
        track.date = context.date.clone();
    } else if let Some(embedded) = api.album {
        if !embedded.name.trim().is_empty() {
            track.album = embedded.name;
        }
        track.cover_url = embedded.images.first().map(|image| image.url.clone());
        track.date = embedded.release_date.unwrap_or_default();
    }

    Some(track)
}

impl CatalogClient {
    /// Resolve a free-text query or item URL into downloadable tracks
    ///
    /// Covers single tracks, albums, playlists and artist top tracks. An
    /// empty result means nothing matched; no downloads are attempted.
    pub async fn resolve(&self, query: &str) -> Result<Vec<Track>> {
        let (kind, id) = match parse_item_url(query) {
            Some(found) => found,
            None => match self
                .search_tracks(query, 1, 0)
                .await?
                .into_iter()
                .find_map(|hit| hit.id)
            {
                Some(id) => (ItemKind::Track, id),
                None => return Ok(Vec::new()),
            },
        };
        debug!("Resolved query to {} {}", kind.as_str(), id);

        let tracks = match kind {
            ItemKind::Track => track_from_api(self.track(&id).await?, None)
                .into_iter()
                .collect(),
            ItemKind::Album => {
                let album = self.album(&id).await?;
                let context = AlbumContext::from(&album);
                album
                    .tracks
                    .items
                    .into_iter()
                    .filter_map(|item| track_from_api(item, Some(&context)))
                    .collect()
            }
            ItemKind::Playlist => self
                .playlist_items(&id)
                .await?
                .into_iter()
                .filter_map(|item| item.track)
                .filter_map(|item| track_from_api(item, None))
                .collect(),
            ItemKind::Artist => self
                .artist_top_tracks(&id)
                .await?
                .into_iter()
                .filter_map(|item| track_from_api(item, None))
                .collect(),
        };

        Ok(tracks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_item_urls_of_every_kind() {
        for kind in ["track", "album", "playlist", "artist"] {
            let url = format!("https://open.spotify.com/{kind}/4uLU6hMCjMI75M1A2tKUQC");
            let (parsed, id) = parse_item_url(&url).unwrap();
            assert_eq!(parsed.as_str(), kind);
            assert_eq!(id, "4uLU6hMCjMI75M1A2tKUQC");
        }
    }

    #[test]
    fn parses_urls_with_intl_segment() {
        let url = "https://open.spotify.com/intl-fr/track/4uLU6hMCjMI75M1A2tKUQC?si=abc";
        let (kind, id) = parse_item_url(url).unwrap();
        assert_eq!(kind, ItemKind::Track);
        assert_eq!(id, "4uLU6hMCjMI75M1A2tKUQC");
    }

    #[test]
    fn rejects_foreign_hosts_and_free_text() {
        assert!(parse_item_url("https://example.com/track/4uLU6hMCjMI75M1A2tKUQC").is_none());
        assert!(parse_item_url("never gonna give you up").is_none());
        assert!(parse_item_url("https://open.spotify.com/show/4uLU6hMCjMI75M1A2tKUQC").is_none());
    }

    #[test]
    fn rejects_malformed_ids() {
        assert!(parse_item_url("https://open.spotify.com/track/tooshort").is_none());
        assert!(parse_item_url("https://open.spotify.com/track/4uLU6hMCjMI75M1A2tKUQ!").is_none());
    }

    #[test]
    fn canonical_url_round_trips_through_the_parser() {
        let url = canonical_url(ItemKind::Album, "6eUW0wxWtzkFdaEFsTJto6");
        assert_eq!(url, "https://open.spotify.com/album/6eUW0wxWtzkFdaEFsTJto6");
        let (kind, id) = parse_item_url(&url).unwrap();
        assert_eq!(kind, ItemKind::Album);
        assert_eq!(id, "6eUW0wxWtzkFdaEFsTJto6");
    }

    #[test]
    fn maps_track_object_fields_onto_the_descriptor() {
        let json = r#"{
            "id": "4uLU6hMCjMI75M1A2tKUQC",
            "name": "Never Gonna Give You Up",
            "duration_ms": 213573,
            "track_number": 3,
            "disc_number": 1,
            "artists": [{"id": null, "name": "Rick Astley"}, {"id": null, "name": "PNAU"}],
            "album": {
                "id": null,
                "name": "Whenever You Need Somebody",
                "images": [{"url": "https://i.scdn.co/image/abc", "width": 640, "height": 640}],
                "release_date": "1987-11-12"
            }
        }"#;
        let api: TrackObject = serde_json::from_str(json).unwrap();

        let track = track_from_api(api, None).unwrap();
        assert_eq!(track.id, "4uLU6hMCjMI75M1A2tKUQC");
        assert_eq!(track.artist, "Rick Astley, PNAU");
        assert_eq!(track.album, "Whenever You Need Somebody");
        assert_eq!(track.date, "1987-11-12");
        assert_eq!(track.duration_secs, 214);
        assert_eq!(track.track_number, 3);
        assert_eq!(
            track.cover_url.as_deref(),
            Some("https://i.scdn.co/image/abc")
        );
        assert_eq!(
            track.source_url.as_deref(),
            Some("https://open.spotify.com/track/4uLU6hMCjMI75M1A2tKUQC")
        );
    }

    #[test]
    fn album_context_overrides_missing_track_album() {
        let json = r#"{"id": "x1234567890123456789012", "name": "Intro", "duration_ms": 62000}"#;
        let api: TrackObject = serde_json::from_str(json).unwrap();
        let context = AlbumContext {
            name: "The Album".to_string(),
            cover_url: Some("https://i.scdn.co/image/cover".to_string()),
            date: "2020-01-01".to_string(),
        };

        let track = track_from_api(api, Some(&context)).unwrap();
        assert_eq!(track.album, "The Album");
        assert_eq!(track.date, "2020-01-01");
        // No artists in the payload keeps the placeholder
        assert_eq!(track.artist, "?");
    }

    #[test]
    fn items_without_an_id_are_dropped() {
        let json = r#"{"name": "Some Episode", "duration_ms": 100}"#;
        let api: TrackObject = serde_json::from_str(json).unwrap();
        assert!(track_from_api(api, None).is_none());
    }
}
