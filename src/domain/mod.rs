//! Domain layer - Core business logic and entities

pub mod artifact;
pub mod cache;
pub mod envelope;
pub mod error;
pub mod knowledge;
pub mod llm;
pub mod pipeline;
pub mod prompt;
pub mod resilience;

pub use artifact::{ParsedArtifact, ParsedOutput, StructuralPatch, WorkflowArtifact, WorkflowNode};
pub use cache::{Cache, CacheEntry, CacheExt, CacheLookup, Fingerprint, ResponseCache};
pub use envelope::{
    Envelope, ErrorKind, Priority, RawRequest, RequestId, SnapshotOutcome, StageError, StageName,
    TerminalSnapshot, ValidationReport,
};
pub use error::DomainError;
pub use knowledge::{
    AutoCorrector, CorrectionReport, KnowledgeError, KnowledgeValidator, RuleSet, Severity,
    ValidationResult, Violation,
};
pub use llm::{FinishReason, LlmProvider, LlmRequest, LlmResponse, Message, MessageRole, Usage};
pub use pipeline::{AuditRecord, AuditSink, DeliverySink, PipelineState, Stage, StageContext};
pub use prompt::{PromptOverrides, StagePrompts};
pub use resilience::{
    CircuitBreaker, CircuitBreakerConfig, CircuitState, GenerationClient, GenerationError,
    RetryPolicy,
};
