//! librespot-backed streaming session
//!
//! Owns the session lifecycle as an explicit state machine
//! (`Uninitialized -> AwaitingCredentials -> Ready -> Closed`). The rest of
//! the crate only sees [`StreamingSession`], never the raw librespot types.
//!
//! First-time credential bootstrap uses zeroconf device pairing: the process
//! announces itself as a device, the user logs in from an official client,
//! and the received credentials are cached for later runs.

use std::io::{Read, Seek, SeekFrom};
use std::path::PathBuf;
use std::sync::RwLock;

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::StreamExt;
use librespot_audio::{AudioDecrypt, AudioFile};
use librespot_core::authentication::Credentials;
use librespot_core::cache::Cache;
use librespot_core::config::SessionConfig;
use librespot_core::error::ErrorKind;
use librespot_core::session::Session;
use librespot_core::spotify_id::SpotifyId;
use librespot_discovery::Discovery;
use librespot_metadata::audio::AudioFileFormat;
use librespot_metadata::{Metadata, Track as TrackMetadata};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use super::{ByteStream, QualityTier, StreamError, StreamingSession};

/// Every encrypted asset starts with a normalisation header we must skip
const NORMALISATION_HEADER_BYTES: u64 = 0xa7;

/// Fetch pacing passed to the audio file loader; effectively "as fast as
/// the connection allows" for a downloader
const DOWNLOAD_BYTES_PER_SECOND: usize = 40 * 1024 * 1024;

enum SessionState {
    Uninitialized,
    AwaitingCredentials,
    Ready(Session),
    Closed,
}

/// Streaming session backed by a librespot device-emulation connection
pub struct LibrespotSession {
    state: RwLock<SessionState>,
    cache_dir: PathBuf,
}

impl LibrespotSession {
    pub fn new(cache_dir: PathBuf) -> Self {
        Self {
            state: RwLock::new(SessionState::Uninitialized),
            cache_dir,
        }
    }

    /// Connect the session, running the device-pairing flow if no cached
    /// credentials exist yet
    pub async fn connect(&self) -> Result<()> {
        info!("Initializing streaming session");

        let cache = Cache::new(Some(&self.cache_dir), None, None, None)
            .context("Failed to open session credential cache")?;

        let credentials = match cache.credentials() {
            Some(credentials) => credentials,
            None => {
                self.set_state(SessionState::AwaitingCredentials);
                self.await_pairing().await?
            }
        };

        let session = Session::new(SessionConfig::default(), Some(cache));
        session
            .connect(credentials, true)
            .await
            .context("Failed to connect streaming session")?;

        info!("Streaming session created");
        self.set_state(SessionState::Ready(session));
        Ok(())
    }

    /// Announce a pairing device and wait for credentials from an official
    /// client
    async fn await_pairing(&self) -> Result<Credentials> {
        let config = SessionConfig::default();
        let mut discovery = Discovery::builder(pairing_device_id(), config.client_id.clone())
            .name("tunegrab")
            .launch()
            .context("Failed to start device pairing")?;

        warn!(
            "Please log in from an official Spotify client: \
             \"tunegrab\" should appear in the devices tab."
        );

        let credentials = discovery
            .next()
            .await
            .context("Device pairing ended before credentials arrived")?;

        info!("Credentials received, you can close the Spotify client.");
        Ok(credentials)
    }

    /// Shut the session down; it cannot be reused afterwards
    pub fn close(&self) {
        let mut state = self.state.write().expect("session state lock poisoned");
        if let SessionState::Ready(session) = &*state {
            session.shutdown();
            info!("Streaming session closed");
        }
        *state = SessionState::Closed;
    }

    fn set_state(&self, next: SessionState) {
        *self.state.write().expect("session state lock poisoned") = next;
    }
}

#[async_trait]
impl StreamingSession for LibrespotSession {
    fn ready(&self) -> bool {
        matches!(
            *self.state.read().expect("session state lock poisoned"),
            SessionState::Ready(_)
        )
    }

    async fn request_stream(
        &self,
        track_id: &str,
        tier: QualityTier,
    ) -> Result<ByteStream, StreamError> {
        // Clone the handle out so no lock is held across awaits
        let session = {
            let state = self.state.read().expect("session state lock poisoned");
            match &*state {
                SessionState::Ready(session) => session.clone(),
                _ => return Err(StreamError::Fatal("session is not ready".to_string())),
            }
        };

        let id = SpotifyId::from_base62(track_id)
            .map_err(|e| StreamError::Fatal(format!("invalid track id {track_id}: {e}")))?;

        let metadata = TrackMetadata::get(&session, &id).await.map_err(|e| {
            if matches!(e.kind, ErrorKind::NotFound) {
                StreamError::ContentUnavailable
            } else {
                StreamError::Transient(format!("track metadata fetch failed: {e}"))
            }
        })?;

        let file_id = tier_formats(tier)
            .iter()
            .find_map(|format| metadata.files.get(format))
            .cloned()
            .ok_or(StreamError::ContentUnavailable)?;
        debug!("Selected {:?} asset for {}", tier, track_id);

        let key = session
            .audio_key()
            .request(id, file_id)
            .await
            .map_err(|e| StreamError::Transient(format!("audio key request failed: {e}")))?;

        let encrypted = AudioFile::open(&session, file_id, DOWNLOAD_BYTES_PER_SECOND)
            .await
            .map_err(|e| StreamError::Transient(format!("audio file open failed: {e}")))?;

        let mut decrypted = AudioDecrypt::new(Some(key), encrypted);
        decrypted
            .seek(SeekFrom::Start(NORMALISATION_HEADER_BYTES))
            .map_err(|e| StreamError::Transient(format!("stream seek failed: {e}")))?;

        Ok(Box::new(decrypted) as Box<dyn Read + Send>)
    }
}

/// File formats accepted for a tier, in preference order
fn tier_formats(tier: QualityTier) -> &'static [AudioFileFormat] {
    match tier {
        QualityTier::Lossless => &[AudioFileFormat::FLAC_FLAC],
        QualityTier::VeryHigh => &[
            AudioFileFormat::OGG_VORBIS_320,
            AudioFileFormat::OGG_VORBIS_160,
            AudioFileFormat::OGG_VORBIS_96,
        ],
    }
}

/// Stable 40-hex-char device id for the pairing announcement
///
/// Hashing the home directory keeps the id stable per machine/user so the
/// paired device does not multiply in the account's device list.
fn pairing_device_id() -> String {
    let mut hasher = Sha256::new();
    hasher.update(b"tunegrab");
    if let Some(home) = dirs::home_dir() {
        hasher.update(home.to_string_lossy().as_bytes());
    }
    hex::encode(&hasher.finalize()[..20])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pairing_device_id_is_stable_hex() {
        let a = pairing_device_id();
        let b = pairing_device_id();
        assert_eq!(a, b);
        assert_eq!(a.len(), 40);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn lossless_tier_only_accepts_flac() {
        assert_eq!(
            tier_formats(QualityTier::Lossless),
            &[AudioFileFormat::FLAC_FLAC]
        );
    }

    #[test]
    fn new_session_is_not_ready() {
        let session = LibrespotSession::new(PathBuf::from("/tmp/does-not-matter"));
        assert!(!session.ready());
    }
}
