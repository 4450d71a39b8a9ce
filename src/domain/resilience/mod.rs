//! Resilience domain: retry policy, error classification, circuit breaking
//! and the generation client contract

mod attempt;
mod circuit_breaker;
mod client;
mod policy;

pub use attempt::{AttemptOutcome, AttemptRecord, AttemptRecorder, InMemoryAttemptRecorder};
pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use client::{GenerationClient, GenerationError};
pub use policy::{ErrorClass, RetryPolicy};

#[cfg(test)]
pub use client::MockGenerationClient;
