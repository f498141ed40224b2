//! Track descriptor: the in-memory representation of one downloadable item

use std::fmt;

/// Audio container format of a downloaded track
///
/// `Flac` is what the lossless quality tier delivers, `Ogg` the compressed
/// (Vorbis) tier. The format starts out as `Flac` and is downgraded by the
/// stream acquirer when no lossless asset exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    Flac,
    Ogg,
}

impl AudioFormat {
    /// File extension without the leading dot
    pub fn ext(&self) -> &'static str {
        match self {
            AudioFormat::Flac => "flac",
            AudioFormat::Ogg => "ogg",
        }
    }

    /// Whether the tagger knows how to write metadata for this format
    pub fn is_taggable(&self) -> bool {
        matches!(self, AudioFormat::Ogg)
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.ext())
    }
}

/// Metadata for one resolvable audio item
///
/// Created by the catalog resolver, consumed exactly once by the downloader.
/// Text fields default to `"?"` when the catalog has no value for them.
#[derive(Debug, Clone)]
pub struct Track {
    /// Opaque catalog track id (base62)
    pub id: String,
    /// Canonical item URL, used for display
    pub source_url: Option<String>,
    pub title: String,
    /// Comma-joined rendering of `artists`, kept in sync by the setters
    pub artist: String,
    /// All contributing artists, never empty
    pub artists: Vec<String>,
    pub album: String,
    /// Release date as reported by the catalog, may be empty
    pub date: String,
    pub cover_url: Option<String>,
    pub duration_secs: u32,
    pub track_number: u32,
    pub disc_number: u32,
    /// Selected download format, downgraded on quality-tier fallback
    pub format: AudioFormat,
}

impl Track {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            source_url: None,
            title: "?".to_string(),
            artist: "?".to_string(),
            artists: vec!["?".to_string()],
            album: "?".to_string(),
            date: String::new(),
            cover_url: None,
            duration_secs: 0,
            track_number: 1,
            disc_number: 1,
            format: AudioFormat::Flac,
        }
    }

    /// Set a single artist, replacing the whole artist list
    pub fn set_artist(&mut self, artist: impl Into<String>) -> &mut Self {
        let artist = artist.into();
        self.artists = vec![artist.clone()];
        self.artist = artist;
        self
    }

    /// Set the full artist list; empty input is ignored to keep the
    /// never-empty invariant
    pub fn set_artists(&mut self, artists: Vec<String>) -> &mut Self {
        if !artists.is_empty() {
            self.artist = artists.join(", ");
            self.artists = artists;
        }
        self
    }

    /// First entry of `artists`, used as the artist folder name
    pub fn primary_artist(&self) -> &str {
        &self.artists[0]
    }

    /// `"{artist} - {title}"`, also the base of the file name
    pub fn display_name(&self) -> String {
        format!("{} - {}", self.artist, self.title)
    }

    /// Markdown link form, falling back to the plain display name when no
    /// source URL is known
    pub fn markdown_link(&self) -> String {
        match &self.source_url {
            Some(url) => format!("[{}](<{}>)", self.display_name(), url),
            None => self.display_name(),
        }
    }
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.artist, self.title)
    }
}

/// Equality is over the stable catalog id, not over transient download state
impl PartialEq for Track {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Track {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn artist_is_joined_rendering_of_artists() {
        let mut track = Track::new("4uLU6hMCjMI75M1A2tKUQC");
        track.set_artists(vec!["Rick Astley".to_string(), "PNAU".to_string()]);
        assert_eq!(track.artist, "Rick Astley, PNAU");
        assert_eq!(track.artists.len(), 2);

        track.set_artist("Daft Punk");
        assert_eq!(track.artist, "Daft Punk");
        assert_eq!(track.artists, vec!["Daft Punk".to_string()]);
    }

    #[test]
    fn empty_artist_list_is_ignored() {
        let mut track = Track::new("id");
        track.set_artists(Vec::new());
        assert_eq!(track.artists, vec!["?".to_string()]);
        assert_eq!(track.artist, "?");
    }

    #[test]
    fn display_name_joins_artist_and_title() {
        let mut track = Track::new("id");
        track.title = "Harder Better Faster Stronger".to_string();
        track.set_artist("Daft Punk");
        assert_eq!(
            track.to_string(),
            "Daft Punk - Harder Better Faster Stronger"
        );
    }

    #[test]
    fn markdown_link_uses_source_url_when_present() {
        let mut track = Track::new("id");
        track.title = "Song".to_string();
        track.set_artist("Artist");
        assert_eq!(track.markdown_link(), "Artist - Song");

        track.source_url = Some("https://open.spotify.com/track/id".to_string());
        assert_eq!(
            track.markdown_link(),
            "[Artist - Song](<https://open.spotify.com/track/id>)"
        );
    }

    #[test]
    fn equality_is_by_catalog_id() {
        let mut a = Track::new("same");
        a.title = "One".to_string();
        let mut b = Track::new("same");
        b.title = "Two".to_string();
        b.format = AudioFormat::Ogg;
        assert_eq!(a, b);

        let c = Track::new("other");
        assert_ne!(a, c);
    }

    #[test]
    fn defaults_match_catalog_placeholders() {
        let track = Track::new("id");
        assert_eq!(track.title, "?");
        assert_eq!(track.album, "?");
        assert_eq!(track.track_number, 1);
        assert_eq!(track.disc_number, 1);
        assert_eq!(track.format, AudioFormat::Flac);
        assert!(track.date.is_empty());
    }
}
