//! Configuration for network fetches during ingestion.

use std::time::Duration;

/// Retry/backoff parameters for listing and download requests.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Number of attempts before a listing degrades to an empty result.
    pub max_retries: u32,
    /// Initial retry delay (doubles each retry, plus jitter).
    pub backoff_base: Duration,
    /// Timeout for directory listing requests.
    pub listing_timeout: Duration,
    /// Timeout for profile file downloads.
    pub download_timeout: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_base: Duration::from_secs(2),
            listing_timeout: Duration::from_secs(20),
            download_timeout: Duration::from_secs(60),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_bounded() {
        let config = RetryConfig::default();
        assert_eq!(config.max_retries, 3);
        assert!(config.backoff_base < config.download_timeout);
    }
}
