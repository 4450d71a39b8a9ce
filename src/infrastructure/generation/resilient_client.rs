//! Generation client with per-attempt timeout, retry/backoff and circuit breaking

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::domain::resilience::{
    AttemptOutcome, AttemptRecord, AttemptRecorder, CircuitBreaker, CircuitState, ErrorClass,
    GenerationClient, GenerationError, RetryPolicy,
};
use crate::domain::{DomainError, LlmProvider, LlmRequest, LlmResponse, StageName};
use crate::infrastructure::observability::MetricsAttemptRecorder;

/// Wraps one [`LlmProvider`] with the retry and circuit-breaker policy
#[derive(Debug)]
pub struct ResilientGenerationClient {
    provider: Arc<dyn LlmProvider>,
    model: String,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    policy: RetryPolicy,
    breaker: Arc<CircuitBreaker>,
    recorder: Arc<dyn AttemptRecorder>,
}

enum AttemptResult {
    Done(LlmResponse),
    Failed(DomainError),
    Cancelled,
}

impl ResilientGenerationClient {
    pub fn new(provider: Arc<dyn LlmProvider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature: None,
            max_tokens: None,
            policy: RetryPolicy::default(),
            breaker: Arc::new(CircuitBreaker::default()),
            recorder: Arc::new(MetricsAttemptRecorder),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_breaker(mut self, breaker: Arc<CircuitBreaker>) -> Self {
        self.breaker = breaker;
        self
    }

    pub fn with_recorder(mut self, recorder: Arc<dyn AttemptRecorder>) -> Self {
        self.recorder = recorder;
        self
    }

    /// Sampling defaults applied when the stage request leaves them unset
    pub fn with_sampling(mut self, temperature: Option<f32>, max_tokens: Option<u32>) -> Self {
        self.temperature = temperature;
        self.max_tokens = max_tokens;
        self
    }

    pub fn breaker(&self) -> &Arc<CircuitBreaker> {
        &self.breaker
    }

    fn emit(
        &self,
        stage: StageName,
        attempt: u32,
        started: Instant,
        outcome: AttemptOutcome,
        backoff: Option<Duration>,
    ) {
        self.recorder.record(&AttemptRecord {
            stage,
            attempt,
            latency: started.elapsed(),
            outcome,
            backoff,
        });
    }

    async fn attempt(
        &self,
        request: LlmRequest,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> AttemptResult {
        let call = tokio::time::timeout(timeout, self.provider.chat(&self.model, request));

        tokio::select! {
            biased;
            _ = cancel.cancelled() => AttemptResult::Cancelled,
            result = call => match result {
                Ok(Ok(response)) => AttemptResult::Done(response),
                Ok(Err(e)) => AttemptResult::Failed(e),
                Err(_) => AttemptResult::Failed(DomainError::timeout(timeout)),
            },
        }
    }
}

#[async_trait]
impl GenerationClient for ResilientGenerationClient {
    async fn invoke(
        &self,
        stage: StageName,
        mut request: LlmRequest,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<LlmResponse, GenerationError> {
        if request.temperature.is_none() {
            request.temperature = self.temperature;
        }
        if request.max_tokens.is_none() {
            request.max_tokens = self.max_tokens;
        }

        let max_attempts = self.policy.max_attempts.max(1);
        let mut last_error = String::new();

        for attempt in 1..=max_attempts {
            if cancel.is_cancelled() {
                return Err(GenerationError::Cancelled);
            }

            let started = Instant::now();

            if !self.breaker.try_acquire() {
                self.emit(stage, attempt, started, AttemptOutcome::CircuitOpen, None);
                let message = if last_error.is_empty() {
                    "dependency unavailable".to_string()
                } else {
                    last_error
                };
                return Err(GenerationError::CircuitOpen { message });
            }

            let error = match self.attempt(request.clone(), timeout, cancel).await {
                AttemptResult::Done(response) => {
                    self.breaker.record_success();
                    self.emit(stage, attempt, started, AttemptOutcome::Success, None);
                    debug!(stage = %stage, attempt, "Generation call succeeded");
                    return Ok(response);
                }
                AttemptResult::Cancelled => {
                    self.breaker.abandon_trial();
                    self.emit(stage, attempt, started, AttemptOutcome::Cancelled, None);
                    return Err(GenerationError::Cancelled);
                }
                AttemptResult::Failed(error) => error,
            };

            last_error = error.to_string();

            if ErrorClass::of(&error) == ErrorClass::Permanent {
                // The dependency answered, so it counts as healthy
                self.breaker.record_success();
                self.emit(stage, attempt, started, AttemptOutcome::Permanent, None);
                warn!(stage = %stage, attempt, error = %error, "Permanent generation failure");
                return Err(GenerationError::Permanent {
                    message: last_error,
                });
            }

            if self.breaker.record_failure() {
                warn!(stage = %stage, attempt, "Circuit breaker opened");
                self.recorder.circuit_opened();
            }

            if attempt == max_attempts {
                self.emit(stage, attempt, started, AttemptOutcome::Transient, None);
                break;
            }

            let delay = self
                .policy
                .delay_before_retry(attempt - 1, error.retry_after());
            self.emit(stage, attempt, started, AttemptOutcome::Transient, Some(delay));
            warn!(
                stage = %stage,
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "Transient generation failure, retrying"
            );

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(GenerationError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
        }

        Err(GenerationError::RetriesExhausted {
            attempts: max_attempts,
            message: last_error,
        })
    }

    fn circuit_state(&self) -> CircuitState {
        self.breaker.state()
    }
}
