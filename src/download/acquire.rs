//! Stream acquisition with quality-tier fallback and bounded retry

use thiserror::Error;
use tokio::time::sleep;
use tracing::warn;

use crate::config::RetryPolicy;
use crate::session::{ByteStream, QualityTier, StreamError, StreamingSession};
use crate::track::Track;

/// Tier order attempted per track; exactly one fallback, no further tiers
const TIERS: [QualityTier; 2] = [QualityTier::Lossless, QualityTier::VeryHigh];

/// Permanent acquisition failure for one track
#[derive(Debug, Error)]
pub enum AcquireError {
    #[error("no audio source")]
    NoAudioSource,
    #[error("transient failure after retry")]
    TransientAfterRetry,
    #[error("session error: {0}")]
    Session(String),
}

/// Open a byte stream for `track`, trying the lossless tier first
///
/// On content-unavailable the next tier is tried and `track.format` is
/// downgraded to match. A transient failure is retried at the same tier
/// after `policy.backoff`, at most `policy.max_transient_retries` times.
pub async fn acquire(
    session: &dyn StreamingSession,
    track: &mut Track,
    policy: &RetryPolicy,
) -> Result<ByteStream, AcquireError> {
    for (index, &tier) in TIERS.iter().enumerate() {
        let mut transient_attempts = 0u32;
        loop {
            match session.request_stream(&track.id, tier).await {
                Ok(stream) => {
                    track.format = tier.format();
                    return Ok(stream);
                }
                Err(StreamError::ContentUnavailable) => {
                    let Some(&next) = TIERS.get(index + 1) else {
                        return Err(AcquireError::NoAudioSource);
                    };
                    warn!(
                        "No {} asset for \"{}\", falling back to {}",
                        tier.format(),
                        track,
                        next.format()
                    );
                    track.format = next.format();
                    break;
                }
                Err(StreamError::Transient(reason)) => {
                    if transient_attempts >= policy.max_transient_retries {
                        return Err(AcquireError::TransientAfterRetry);
                    }
                    transient_attempts += 1;
                    warn!(
                        "Transient failure for \"{}\" ({}), retrying in {:?}",
                        track, reason, policy.backoff
                    );
                    sleep(policy.backoff).await;
                }
                Err(StreamError::Fatal(reason)) => {
                    return Err(AcquireError::Session(reason));
                }
            }
        }
    }

    Err(AcquireError::NoAudioSource)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::testing::ScriptedSession;
    use crate::track::AudioFormat;
    use std::time::Duration;

    fn policy() -> RetryPolicy {
        RetryPolicy {
            backoff: Duration::ZERO,
            max_transient_retries: 1,
        }
    }

    fn track() -> Track {
        let mut track = Track::new("4uLU6hMCjMI75M1A2tKUQC");
        track.title = "Song".to_string();
        track.set_artist("Artist");
        track
    }

    #[tokio::test]
    async fn lossless_success_keeps_flac() {
        let session = ScriptedSession::new(vec![Ok(vec![1, 2, 3])]);
        let mut track = track();

        acquire(&session, &mut track, &policy()).await.unwrap();
        assert_eq!(track.format, AudioFormat::Flac);
        assert_eq!(session.calls(), vec![QualityTier::Lossless]);
    }

    #[tokio::test]
    async fn content_unavailable_falls_back_to_vorbis() {
        let session = ScriptedSession::new(vec![
            Err(StreamError::ContentUnavailable),
            Ok(vec![1, 2, 3]),
        ]);
        let mut track = track();

        acquire(&session, &mut track, &policy()).await.unwrap();
        assert_eq!(track.format, AudioFormat::Ogg);
        assert_eq!(
            session.calls(),
            vec![QualityTier::Lossless, QualityTier::VeryHigh]
        );
    }

    #[tokio::test]
    async fn both_tiers_unavailable_is_permanent() {
        let session = ScriptedSession::new(vec![
            Err(StreamError::ContentUnavailable),
            Err(StreamError::ContentUnavailable),
        ]);
        let mut track = track();

        let err = acquire(&session, &mut track, &policy()).await.unwrap_err();
        assert!(matches!(err, AcquireError::NoAudioSource));
        assert_eq!(session.call_count(), 2);
    }

    #[tokio::test]
    async fn transient_failure_is_retried_once_at_same_tier() {
        let session = ScriptedSession::new(vec![
            Err(StreamError::Transient("token timeout".to_string())),
            Ok(vec![1, 2, 3]),
        ]);
        let mut track = track();

        acquire(&session, &mut track, &policy()).await.unwrap();
        assert_eq!(track.format, AudioFormat::Flac);
        assert_eq!(
            session.calls(),
            vec![QualityTier::Lossless, QualityTier::Lossless]
        );
    }

    #[tokio::test]
    async fn second_consecutive_transient_fails() {
        let session = ScriptedSession::new(vec![
            Err(StreamError::Transient("timeout".to_string())),
            Err(StreamError::Transient("timeout".to_string())),
        ]);
        let mut track = track();

        let err = acquire(&session, &mut track, &policy()).await.unwrap_err();
        assert!(matches!(err, AcquireError::TransientAfterRetry));
        assert_eq!(session.call_count(), 2);
    }

    #[tokio::test]
    async fn fatal_error_is_not_retried() {
        let session =
            ScriptedSession::new(vec![Err(StreamError::Fatal("not ready".to_string()))]);
        let mut track = track();

        let err = acquire(&session, &mut track, &policy()).await.unwrap_err();
        assert!(matches!(err, AcquireError::Session(_)));
        assert_eq!(session.call_count(), 1);
    }
}
