//! Streaming session interface
//!
//! The downloader only ever sees the [`StreamingSession`] trait; the
//! device-emulation backend that actually speaks the streaming protocol
//! lives in [`librespot`].

pub mod librespot;

use async_trait::async_trait;
use thiserror::Error;

use crate::track::AudioFormat;

pub use librespot::LibrespotSession;

/// An opened audio byte stream, exclusively owned by its consumer
pub type ByteStream = Box<dyn std::io::Read + Send>;

/// Audio quality tier requested from the streaming backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualityTier {
    /// Lossless (FLAC)
    Lossless,
    /// Compressed (Vorbis, highest bitrate)
    VeryHigh,
}

impl QualityTier {
    /// Container format this tier delivers
    pub fn format(&self) -> AudioFormat {
        match self {
            QualityTier::Lossless => AudioFormat::Flac,
            QualityTier::VeryHigh => AudioFormat::Ogg,
        }
    }
}

/// Failure modes of a stream request
#[derive(Debug, Error)]
pub enum StreamError {
    /// The backend has no asset at the requested quality tier
    #[error("no suitable audio file at the requested quality")]
    ContentUnavailable,
    /// Authorization/timeout-class failure worth retrying
    #[error("transient session failure: {0}")]
    Transient(String),
    /// The session cannot serve requests at all
    #[error("session failure: {0}")]
    Fatal(String),
}

/// Handle to an authorized streaming session
#[async_trait]
pub trait StreamingSession: Send + Sync {
    /// Whether the session is connected and able to serve stream requests
    fn ready(&self) -> bool;

    /// Open the audio byte stream for a track at the given quality tier
    async fn request_stream(
        &self,
        track_id: &str,
        tier: QualityTier,
    ) -> Result<ByteStream, StreamError>;
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::io::Cursor;
    use std::sync::Mutex;

    /// Scripted fake session: answers requests from a fixed response queue
    /// and records which tiers were asked for
    pub struct ScriptedSession {
        responses: Mutex<VecDeque<Result<Vec<u8>, StreamError>>>,
        calls: Mutex<Vec<QualityTier>>,
    }

    impl ScriptedSession {
        pub fn new(responses: Vec<Result<Vec<u8>, StreamError>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                calls: Mutex::new(Vec::new()),
            }
        }

        pub fn calls(&self) -> Vec<QualityTier> {
            self.calls.lock().unwrap().clone()
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl StreamingSession for ScriptedSession {
        fn ready(&self) -> bool {
            true
        }

        async fn request_stream(
            &self,
            _track_id: &str,
            tier: QualityTier,
        ) -> Result<ByteStream, StreamError> {
            self.calls.lock().unwrap().push(tier);
            match self.responses.lock().unwrap().pop_front() {
                Some(Ok(bytes)) => Ok(Box::new(Cursor::new(bytes)) as ByteStream),
                Some(Err(e)) => Err(e),
                None => Err(StreamError::Fatal("response script exhausted".to_string())),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_format_mapping() {
        assert_eq!(QualityTier::Lossless.format(), AudioFormat::Flac);
        assert_eq!(QualityTier::VeryHigh.format(), AudioFormat::Ogg);
    }
}
