//! Stage names and the pipeline error taxonomy

use std::fmt;

use serde::{Deserialize, Serialize};

/// Pipeline positions, in execution order.
///
/// `Intake` is the entry check; it may record errors but never produces a
/// stage output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageName {
    Intake,
    Parse,
    Design,
    Synthesize,
    Validate,
    Correct,
}

impl StageName {
    /// Stages run by the orchestrator, in order
    pub const PIPELINE: [StageName; 5] = [
        Self::Parse,
        Self::Design,
        Self::Synthesize,
        Self::Validate,
        Self::Correct,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Intake => "intake",
            Self::Parse => "parse",
            Self::Design => "design",
            Self::Synthesize => "synthesize",
            Self::Validate => "validate",
            Self::Correct => "correct",
        }
    }

    pub fn position(&self) -> usize {
        *self as usize
    }

    /// Whether this stage calls the generative model
    pub fn calls_model(&self) -> bool {
        matches!(self, Self::Parse | Self::Design | Self::Synthesize)
    }
}

impl fmt::Display for StageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    /// Malformed initial request, rejected before the first stage
    ValidationInput,
    /// Retryable external-call failure that exhausted its retries
    TransientDependency,
    /// Non-retryable external-call failure
    PermanentDependency,
    /// A stage was missing an expected prior output
    Structural,
    /// Quality issue in the artifact; never fatal
    RuleViolation,
    /// The model returned content that could not be parsed
    MalformedOutput,
    /// Request-level abort or deadline
    Cancelled,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ValidationInput => "validation-input",
            Self::TransientDependency => "transient-dependency",
            Self::PermanentDependency => "permanent-dependency",
            Self::Structural => "structural",
            Self::RuleViolation => "rule-violation",
            Self::MalformedOutput => "malformed-output",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error entry accumulated on the envelope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageError {
    pub stage: StageName,
    pub kind: ErrorKind,
    pub message: String,
    pub fatal: bool,
}

impl StageError {
    pub fn fatal(stage: StageName, kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            stage,
            kind,
            message: message.into(),
            fatal: true,
        }
    }

    pub fn non_fatal(stage: StageName, kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            stage,
            kind,
            message: message.into(),
            fatal: false,
        }
    }
}
