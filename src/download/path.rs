//! Target path computation for downloaded tracks

use std::path::{Path, PathBuf};

use crate::track::Track;
use crate::utils::sanitize_filename;

/// One sanitized path component; blank metadata falls back to the `"?"`
/// placeholder before sanitization so every component stays non-empty
fn component(raw: &str) -> String {
    let trimmed = raw.trim();
    let base = if trimmed.is_empty() { "?" } else { trimmed };
    sanitize_filename(base)
}

/// Compute `root/artist/album/artist - title.ext` for a track
///
/// Pure function of the root and the track's current metadata; callers must
/// recompute after stream acquisition since the extension can change on
/// quality-tier fallback.
pub fn resolve_path(root: &Path, track: &Track) -> PathBuf {
    let file_name = format!("{}.{}", track.display_name(), track.format.ext());
    root.join(component(track.primary_artist()))
        .join(component(&track.album))
        .join(component(&file_name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::track::AudioFormat;

    fn track() -> Track {
        let mut track = Track::new("4uLU6hMCjMI75M1A2tKUQC");
        track.title = "Never Gonna Give You Up".to_string();
        track.album = "Whenever You Need Somebody".to_string();
        track.set_artist("Rick Astley");
        track
    }

    #[test]
    fn builds_artist_album_file_tree() {
        let path = resolve_path(Path::new("/music"), &track());
        assert_eq!(
            path,
            PathBuf::from(
                "/music/Rick Astley/Whenever You Need Somebody/\
                 Rick Astley - Never Gonna Give You Up.flac"
            )
        );
    }

    #[test]
    fn is_deterministic() {
        let track = track();
        let a = resolve_path(Path::new("/music"), &track);
        let b = resolve_path(Path::new("/music"), &track);
        assert_eq!(a, b);
    }

    #[test]
    fn sanitizes_every_component() {
        let mut track = track();
        track.set_artist("AC/DC");
        track.album = "Back: In Black?".to_string();
        track.title = "What|Is*This".to_string();

        let path = resolve_path(Path::new("/music"), &track);
        let rendered = path.to_string_lossy();
        assert!(rendered.contains("AC-DC"));
        assert!(rendered.contains("Back- In Black-"));
        assert!(rendered.contains("AC-DC - What-Is-This.flac"));
    }

    #[test]
    fn extension_follows_format() {
        let mut track = track();
        assert!(
            resolve_path(Path::new("/music"), &track)
                .to_string_lossy()
                .ends_with(".flac")
        );
        track.format = AudioFormat::Ogg;
        assert!(
            resolve_path(Path::new("/music"), &track)
                .to_string_lossy()
                .ends_with(".ogg")
        );
    }

    #[test]
    fn blank_metadata_gets_placeholder_components() {
        let mut track = Track::new("id");
        track.album = "   ".to_string();
        let path = resolve_path(Path::new("/music"), &track);
        // "?" placeholders sanitize to "-"
        assert_eq!(path, PathBuf::from("/music/-/-/- - -.flac"));
    }
}
