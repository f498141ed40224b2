//! Spotify Web API response models
//!
//! Only the fields the pipeline needs; everything else is ignored during
//! deserialization. Optional throughout because simplified variants of the
//! same objects omit fields (album tracks have no album, playlist items may
//! hold episodes).

use serde::Deserialize;

/// Client-credentials token grant
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Image {
    pub url: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArtistRef {
    pub id: Option<String>,
    pub name: String,
}

/// Album as embedded in a full track object
#[derive(Debug, Clone, Deserialize)]
pub struct AlbumObject {
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub images: Vec<Image>,
    pub release_date: Option<String>,
}

/// Track object, full or simplified
#[derive(Debug, Clone, Deserialize)]
pub struct TrackObject {
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub duration_ms: u64,
    pub track_number: Option<u32>,
    pub disc_number: Option<u32>,
    #[serde(default)]
    pub artists: Vec<ArtistRef>,
    pub album: Option<AlbumObject>,
}

/// One page of track objects (search results, album tracks)
#[derive(Debug, Clone, Deserialize)]
pub struct TrackPage {
    #[serde(default)]
    pub items: Vec<TrackObject>,
    pub next: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
    pub tracks: Option<TrackPage>,
}

/// Album endpoint response with its embedded track page
#[derive(Debug, Clone, Deserialize)]
pub struct AlbumWithTracks {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub images: Vec<Image>,
    pub release_date: Option<String>,
    pub tracks: TrackPage,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlaylistItem {
    pub track: Option<TrackObject>,
}

/// One page of playlist items
#[derive(Debug, Clone, Deserialize)]
pub struct PlaylistItemsPage {
    #[serde(default)]
    pub items: Vec<PlaylistItem>,
    pub next: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TopTracksResponse {
    #[serde(default)]
    pub tracks: Vec<TrackObject>,
}
