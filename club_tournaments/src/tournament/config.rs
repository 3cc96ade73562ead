//! Engine tuning read from the environment.

use crate::db::timeouts::{DEFAULT_RETRY_BACKOFF, DEFAULT_WRITE_RETRIES, RetryPolicy};
use std::env;
use std::time::Duration;

/// Engine configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Retries for a busy or locked database during the schedule write
    pub write_retries: u32,

    /// Backoff before the first retry, in milliseconds
    pub retry_backoff_ms: u64,
}

impl EngineConfig {
    /// Create configuration from environment variables
    ///
    /// - `SCHEDULE_WRITE_RETRIES` (default: 3)
    /// - `SCHEDULE_RETRY_BACKOFF_MS` (default: 25)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            write_retries: env::var("SCHEDULE_WRITE_RETRIES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.write_retries),
            retry_backoff_ms: env::var("SCHEDULE_RETRY_BACKOFF_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.retry_backoff_ms),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.write_retries, Duration::from_millis(self.retry_backoff_ms))
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            write_retries: DEFAULT_WRITE_RETRIES,
            retry_backoff_ms: DEFAULT_RETRY_BACKOFF.as_millis() as u64,
        }
    }
}
