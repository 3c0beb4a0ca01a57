//! Configuration options for the CRM admin client

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Error, Result};

/// Backoff schedule applied when the backend reports it is still initializing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Delay before each retry; the length is the retry budget
    pub delays: Vec<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            delays: vec![
                Duration::from_secs(2),
                Duration::from_secs(4),
                Duration::from_secs(8),
            ],
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries
    pub fn none() -> Self {
        Self { delays: Vec::new() }
    }

    /// Exponential schedule starting at `base`, doubling `retries` times.
    ///
    /// Delays saturate at `Duration::MAX` instead of overflowing.
    pub fn exponential(base: Duration, retries: u32) -> Self {
        Self {
            delays: (0..retries)
                .map(|n| base.saturating_mul(2u32.saturating_pow(n)))
                .collect(),
        }
    }

    /// Number of retries after the first attempt
    pub fn max_retries(&self) -> usize {
        self.delays.len()
    }

    /// Sum of every delay in the schedule
    pub fn total_delay(&self) -> Duration {
        self.delays.iter().fold(Duration::ZERO, |total, d| total.saturating_add(*d))
    }
}

/// Configuration options for the CRM admin client
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Base URL of the backend API
    pub api_url: String,

    /// Timeout for ordinary requests
    pub request_timeout: Duration,

    /// Timeout for health and setup requests
    pub long_timeout: Duration,

    /// Retry schedule for 503 "initializing" responses
    pub retry: RetryPolicy,

    /// How often number claims are re-fetched
    pub claim_refresh_interval: Duration,

    /// Minimum spacing between offline-mode health probes
    pub offline_probe_interval: Duration,

    /// How often the daily counter reset is checked
    pub daily_reset_interval: Duration,

    /// Directory for the file-backed local store; `None` keeps it in memory
    pub storage_dir: Option<PathBuf>,

    /// Prefix applied to every local storage key
    pub storage_namespace: String,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:3001/api".to_string(),
            request_timeout: Duration::from_secs(30),
            long_timeout: Duration::from_secs(60),
            retry: RetryPolicy::default(),
            claim_refresh_interval: Duration::from_secs(30),
            offline_probe_interval: Duration::from_secs(30),
            daily_reset_interval: Duration::from_secs(60),
            storage_dir: None,
            storage_namespace: "crm".to_string(),
        }
    }
}

impl ClientOptions {
    /// Load options from the environment, reading `.env` first if present.
    ///
    /// Recognized variables: `CRM_API_URL`, `CRM_STORAGE_DIR`,
    /// `CRM_STORAGE_NAMESPACE` and `CRM_REQUEST_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let mut options = Self::default();

        if let Ok(url) = std::env::var("CRM_API_URL") {
            options.api_url = url;
        }
        if let Ok(dir) = std::env::var("CRM_STORAGE_DIR") {
            options.storage_dir = Some(PathBuf::from(dir));
        }
        if let Ok(namespace) = std::env::var("CRM_STORAGE_NAMESPACE") {
            options.storage_namespace = namespace;
        }
        if let Ok(secs) = std::env::var("CRM_REQUEST_TIMEOUT_SECS") {
            let secs = secs.parse::<u64>().map_err(|_| {
                Error::config(format!("CRM_REQUEST_TIMEOUT_SECS must be a whole number, got {secs:?}"))
            })?;
            options.request_timeout = Duration::from_secs(secs);
        }

        Ok(options)
    }

    /// Set the backend base URL
    pub fn with_api_url(mut self, value: &str) -> Self {
        self.api_url = value.to_string();
        self
    }

    /// Set the ordinary request timeout
    pub fn with_request_timeout(mut self, value: Duration) -> Self {
        self.request_timeout = value;
        self
    }

    /// Set the health/setup request timeout
    pub fn with_long_timeout(mut self, value: Duration) -> Self {
        self.long_timeout = value;
        self
    }

    /// Set the retry policy
    pub fn with_retry(mut self, value: RetryPolicy) -> Self {
        self.retry = value;
        self
    }

    /// Set the claim refresh interval
    pub fn with_claim_refresh_interval(mut self, value: Duration) -> Self {
        self.claim_refresh_interval = value;
        self
    }

    /// Set the offline probe interval
    pub fn with_offline_probe_interval(mut self, value: Duration) -> Self {
        self.offline_probe_interval = value;
        self
    }

    /// Set the daily reset check interval
    pub fn with_daily_reset_interval(mut self, value: Duration) -> Self {
        self.daily_reset_interval = value;
        self
    }

    /// Persist local storage under the given directory
    pub fn with_storage_dir(mut self, value: impl Into<PathBuf>) -> Self {
        self.storage_dir = Some(value.into());
        self
    }

    /// Set the local storage namespace
    pub fn with_storage_namespace(mut self, value: &str) -> Self {
        self.storage_namespace = value.to_string();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_retry_schedule() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_retries(), 3);
        assert_eq!(policy.total_delay(), Duration::from_secs(14));
        assert_eq!(policy, RetryPolicy::exponential(Duration::from_secs(2), 3));
    }

    #[test]
    fn long_schedules_saturate() {
        let policy = RetryPolicy::exponential(Duration::from_secs(2), 40);
        assert_eq!(policy.max_retries(), 40);
        assert_eq!(policy.delays[39], Duration::from_secs(2).saturating_mul(u32::MAX));
    }

    #[test]
    fn default_timeouts() {
        let options = ClientOptions::default();
        assert_eq!(options.request_timeout, Duration::from_secs(30));
        assert_eq!(options.long_timeout, Duration::from_secs(60));
        assert_eq!(options.claim_refresh_interval, Duration::from_secs(30));
        assert_eq!(options.daily_reset_interval, Duration::from_secs(60));
    }

    #[test]
    fn builder_overrides() {
        let options = ClientOptions::default()
            .with_api_url("http://backend:8080")
            .with_retry(RetryPolicy::none())
            .with_storage_namespace("test");
        assert_eq!(options.api_url, "http://backend:8080");
        assert_eq!(options.retry.max_retries(), 0);
        assert_eq!(options.storage_namespace, "test");
    }
}
