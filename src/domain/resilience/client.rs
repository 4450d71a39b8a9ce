//! Resilient generation client contract

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

#[cfg(test)]
use mockall::automock;

use super::CircuitState;
use crate::domain::envelope::{ErrorKind, StageName};
use crate::domain::llm::{LlmRequest, LlmResponse};

/// Failure returned to a stage once retry policy is exhausted or bypassed
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GenerationError {
    #[error("permanent failure: {message}")]
    Permanent { message: String },

    #[error("gave up after {attempts} attempts: {message}")]
    RetriesExhausted { attempts: u32, message: String },

    #[error("circuit open: {message}")]
    CircuitOpen { message: String },

    #[error("cancelled")]
    Cancelled,
}

impl GenerationError {
    /// Error taxonomy entry recorded on the envelope
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Permanent { .. } => ErrorKind::PermanentDependency,
            Self::RetriesExhausted { .. } | Self::CircuitOpen { .. } => {
                ErrorKind::TransientDependency
            }
            Self::Cancelled => ErrorKind::Cancelled,
        }
    }
}

/// Single entry point for every generative model call
#[cfg_attr(test, automock)]
#[async_trait]
pub trait GenerationClient: Send + Sync {
    /// Call the model with a per-attempt timeout, retrying transient failures
    async fn invoke(
        &self,
        stage: StageName,
        request: LlmRequest,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<LlmResponse, GenerationError>;

    fn circuit_state(&self) -> CircuitState;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            GenerationError::Permanent {
                message: "400".to_string()
            }
            .kind(),
            ErrorKind::PermanentDependency
        );
        assert_eq!(
            GenerationError::RetriesExhausted {
                attempts: 3,
                message: "503".to_string()
            }
            .kind(),
            ErrorKind::TransientDependency
        );
        assert_eq!(
            GenerationError::CircuitOpen {
                message: String::new()
            }
            .kind(),
            ErrorKind::TransientDependency
        );
        assert_eq!(GenerationError::Cancelled.kind(), ErrorKind::Cancelled);
    }

    #[test]
    fn test_display() {
        let err = GenerationError::RetriesExhausted {
            attempts: 3,
            message: "HTTP 503: busy".to_string(),
        };
        assert_eq!(err.to_string(), "gave up after 3 attempts: HTTP 503: busy");
    }
}
