//! Runtime configuration
//!
//! All behavioral knobs live in one value that is passed into the components
//! that need it at construction time. There is no global config state.

use std::path::PathBuf;
use std::time::Duration;

/// Retry behavior for transient stream-acquisition failures
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Fixed wait before retrying the same quality tier
    pub backoff: Duration,
    /// How many times a transient failure is retried per tier
    pub max_transient_retries: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            backoff: Duration::from_secs(60),
            max_transient_retries: 1,
        }
    }
}

/// Downloader configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Root of the artist/album file tree
    pub music_dir: PathBuf,
    /// Open the containing folder in the file manager after a batch
    pub reveal_after_download: bool,
    /// Batch sizes above this require an explicit confirmation
    pub confirm_threshold: usize,
    pub retry: RetryPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            music_dir: dirs::audio_dir()
                .map(|dir| dir.join("tunegrab"))
                .unwrap_or_else(|| PathBuf::from("tracks")),
            reveal_after_download: true,
            confirm_threshold: 10,
            retry: RetryPolicy::default(),
        }
    }
}

impl Config {
    /// Directory for session credentials and other cached state
    pub fn cache_dir() -> PathBuf {
        dirs::cache_dir()
            .map(|dir| dir.join("tunegrab"))
            .unwrap_or_else(|| PathBuf::from(".tunegrab"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_retry_policy_matches_backoff_contract() {
        let retry = RetryPolicy::default();
        assert_eq!(retry.backoff, Duration::from_secs(60));
        assert_eq!(retry.max_transient_retries, 1);
    }

    #[test]
    fn default_confirm_threshold() {
        assert_eq!(Config::default().confirm_threshold, 10);
    }
}
