//! Rolling-window circuit breaker

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

/// Circuit breaker state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// Transient failures within the window that trip the breaker
    pub failure_threshold: u32,
    pub window_ms: u64,
    pub cooldown_ms: u64,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            window_ms: 60_000,
            cooldown_ms: 30_000,
        }
    }
}

#[derive(Debug, Default)]
struct BreakerState {
    failures: VecDeque<Instant>,
    opened_at: Option<Instant>,
    trial_in_flight: bool,
}

/// Fails fast after repeated transient failures.
///
/// While open every call is refused. Once the cool-down has elapsed a single
/// trial call is let through; its outcome closes or re-opens the circuit.
#[derive(Debug)]
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    state: Mutex<BreakerState>,
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            state: Mutex::new(BreakerState::default()),
        }
    }

    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    fn lock(&self) -> MutexGuard<'_, BreakerState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn cooldown(&self) -> Duration {
        Duration::from_millis(self.config.cooldown_ms)
    }

    pub fn state(&self) -> CircuitState {
        let state = self.lock();

        match state.opened_at {
            None => CircuitState::Closed,
            Some(opened) if opened.elapsed() < self.cooldown() => CircuitState::Open,
            Some(_) => CircuitState::HalfOpen,
        }
    }

    /// Ask permission for one call
    pub fn try_acquire(&self) -> bool {
        let mut state = self.lock();

        match state.opened_at {
            None => true,
            Some(opened) if opened.elapsed() < self.cooldown() => false,
            Some(_) if state.trial_in_flight => false,
            Some(_) => {
                state.trial_in_flight = true;
                true
            }
        }
    }

    /// The dependency answered; close the circuit and forget past failures
    pub fn record_success(&self) {
        let mut state = self.lock();
        state.failures.clear();
        state.opened_at = None;
        state.trial_in_flight = false;
    }

    /// Record a transient failure. Returns true when this failure opened the circuit.
    pub fn record_failure(&self) -> bool {
        let mut state = self.lock();
        let now = Instant::now();

        if state.opened_at.is_some() {
            // Failed trial call: restart the cool-down
            state.opened_at = Some(now);
            state.trial_in_flight = false;
            return true;
        }

        let window = Duration::from_millis(self.config.window_ms);
        while state
            .failures
            .front()
            .is_some_and(|t| now.duration_since(*t) > window)
        {
            state.failures.pop_front();
        }
        state.failures.push_back(now);

        if state.failures.len() as u32 >= self.config.failure_threshold {
            state.failures.clear();
            state.opened_at = Some(now);
            return true;
        }

        false
    }

    /// Give back a trial permit whose call never completed
    pub fn abandon_trial(&self) {
        self.lock().trial_in_flight = false;
    }

    pub fn reset(&self) {
        *self.lock() = BreakerState::default();
    }

    /// Failures currently counted in the window
    pub fn recent_failures(&self) -> usize {
        self.lock().failures.len()
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(CircuitBreakerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn breaker(threshold: u32) -> CircuitBreaker {
        CircuitBreaker::new(CircuitBreakerConfig {
            failure_threshold: threshold,
            window_ms: 10_000,
            cooldown_ms: 1_000,
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_opens_at_threshold() {
        let cb = breaker(3);

        assert!(!cb.record_failure());
        assert!(!cb.record_failure());
        assert_eq!(cb.state(), CircuitState::Closed);
        assert!(cb.record_failure());
        assert_eq!(cb.state(), CircuitState::Open);
        assert!(!cb.try_acquire());
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_clears_window() {
        let cb = breaker(3);

        cb.record_failure();
        cb.record_failure();
        cb.record_success();
        cb.record_failure();

        assert_eq!(cb.recent_failures(), 1);
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failures_outside_window_expire() {
        let cb = breaker(2);

        cb.record_failure();
        tokio::time::advance(Duration::from_secs(11)).await;
        assert!(!cb.record_failure());

        assert_eq!(cb.recent_failures(), 1);
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_half_open_allows_single_trial() {
        let cb = breaker(1);
        cb.record_failure();

        tokio::time::advance(Duration::from_millis(1_001)).await;
        assert_eq!(cb.state(), CircuitState::HalfOpen);

        assert!(cb.try_acquire());
        assert!(!cb.try_acquire());

        cb.record_success();
        assert_eq!(cb.state(), CircuitState::Closed);
        assert!(cb.try_acquire());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_trial_reopens() {
        let cb = breaker(1);
        cb.record_failure();
        tokio::time::advance(Duration::from_millis(1_500)).await;

        assert!(cb.try_acquire());
        assert!(cb.record_failure());
        assert_eq!(cb.state(), CircuitState::Open);
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandoned_trial_frees_permit() {
        let cb = breaker(1);
        cb.record_failure();
        tokio::time::advance(Duration::from_millis(1_500)).await;

        assert!(cb.try_acquire());
        cb.abandon_trial();
        assert!(cb.try_acquire());
    }
}
