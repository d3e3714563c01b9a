//! Tunable limits for one automation run.

use std::time::Duration;

use crate::error::CoreError;

/// Maximum number of jobs submitted but not yet terminal.
pub const DEFAULT_MAX_CONCURRENT_SESSIONS: usize = 5;

/// Maximum failed attempts before a job is permanently failed.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// How long the submission loop waits before re-checking capacity.
pub const DEFAULT_SUBMIT_BACKOFF: Duration = Duration::from_secs(2);

/// Pause between full sweeps of the in-flight set.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(8);

/// Per-request HTTP timeout. Remote video generation legitimately takes
/// minutes, but an individual submission or status call should not; a
/// call that exceeds this bound surfaces as a normal retryable failure.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Tunable parameters governing concurrency, retry, and pacing for one
/// automation run.
#[derive(Debug, Clone)]
pub struct AutomationLimits {
    /// Upper bound on the in-flight set size.
    pub max_concurrent_sessions: usize,
    /// Retry budget per job.
    pub max_retries: u32,
    /// Sleep between capacity checks in the submission loop.
    pub submit_backoff: Duration,
    /// Sleep between status sweeps in the poll loop.
    pub poll_interval: Duration,
    /// Timeout applied to every outbound HTTP request.
    pub request_timeout: Duration,
}

impl Default for AutomationLimits {
    fn default() -> Self {
        Self {
            max_concurrent_sessions: DEFAULT_MAX_CONCURRENT_SESSIONS,
            max_retries: DEFAULT_MAX_RETRIES,
            submit_backoff: DEFAULT_SUBMIT_BACKOFF,
            poll_interval: DEFAULT_POLL_INTERVAL,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl AutomationLimits {
    /// Validate that the limits describe a runnable configuration.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.max_concurrent_sessions == 0 {
            return Err(CoreError::Validation(
                "max_concurrent_sessions must be at least 1".to_string(),
            ));
        }
        if self.submit_backoff.is_zero() || self.poll_interval.is_zero() {
            return Err(CoreError::Validation(
                "submit_backoff and poll_interval must be non-zero".to_string(),
            ));
        }
        if self.request_timeout.is_zero() {
            return Err(CoreError::Validation(
                "request_timeout must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}
