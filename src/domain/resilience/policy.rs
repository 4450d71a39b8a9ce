//! Retry policy and error classification

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::DomainError;

/// Retry policy for external generation calls
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts, including the first call
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    /// Upper bound on a server-provided retry-after hint
    pub max_retry_after_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 200,
            max_delay_ms: 5_000,
            max_retry_after_ms: 30_000,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Default::default()
        }
    }

    pub fn with_base_delay(mut self, ms: u64) -> Self {
        self.base_delay_ms = ms;
        self
    }

    pub fn with_max_delay(mut self, ms: u64) -> Self {
        self.max_delay_ms = ms;
        self
    }

    pub fn with_max_retry_after(mut self, ms: u64) -> Self {
        self.max_retry_after_ms = ms;
        self
    }

    /// Computed backoff before retry number `retry` (0-indexed): base × 2^retry, capped
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = 2u64.saturating_pow(retry);
        let delay_ms = self
            .base_delay_ms
            .saturating_mul(factor)
            .min(self.max_delay_ms);

        Duration::from_millis(delay_ms)
    }

    /// Delay before the next attempt; a retry-after hint overrides the backoff
    pub fn delay_before_retry(&self, retry: u32, retry_after: Option<Duration>) -> Duration {
        match retry_after {
            Some(hint) => hint.min(Duration::from_millis(self.max_retry_after_ms)),
            None => self.backoff(retry),
        }
    }
}

/// Retry classification of a failed call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Network timeout, transport failure, 5xx or 429
    Transient,
    /// Any other 4xx, malformed request or response
    Permanent,
}

impl ErrorClass {
    pub fn of(error: &DomainError) -> Self {
        match error {
            DomainError::Http { status, .. } if *status == 429 || *status >= 500 => Self::Transient,
            DomainError::Timeout { .. } | DomainError::Transport { .. } => Self::Transient,
            _ => Self::Permanent,
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient)
    }
}
