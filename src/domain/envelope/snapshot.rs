//! Terminal snapshot handed to the delivery collaborator

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{Envelope, RequestId, StageError, StageName, ValidationReport};
use crate::domain::artifact::WorkflowArtifact;

/// The three user-visible end states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotOutcome {
    /// Pipeline stopped before producing an artifact
    Halted,
    /// Artifact produced with violations left, or never validated
    Unresolved,
    /// Artifact produced and free of violations
    Validated,
}

impl SnapshotOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Halted => "halted",
            Self::Unresolved => "unresolved",
            Self::Validated => "validated",
        }
    }
}

/// Plain structured data; formatting and escaping belong to the recipient
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerminalSnapshot {
    pub request_id: RequestId,
    pub outcome: SnapshotOutcome,
    pub artifact: Option<WorkflowArtifact>,
    pub validation: Option<ValidationReport>,
    pub errors: Vec<StageError>,
    pub stage_latency_ms: BTreeMap<StageName, i64>,
    pub total_latency_ms: i64,
}

impl From<&Envelope> for TerminalSnapshot {
    fn from(envelope: &Envelope) -> Self {
        let outcome = match (envelope.artifact(), envelope.validation()) {
            (None, _) => SnapshotOutcome::Halted,
            (Some(_), Some(report)) if report.violations.is_empty() && !envelope.has_fatal() => {
                SnapshotOutcome::Validated
            }
            (Some(_), _) => SnapshotOutcome::Unresolved,
        };

        Self {
            request_id: envelope.request_id(),
            outcome,
            artifact: envelope.artifact().cloned(),
            validation: envelope.validation().cloned(),
            errors: envelope.errors().to_vec(),
            stage_latency_ms: envelope.stage_latencies(),
            total_latency_ms: envelope.total_latency_ms(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::envelope::{ErrorKind, RawRequest};
    use crate::domain::knowledge::ValidationResult;

    fn envelope() -> Envelope {
        Envelope::new(RequestId::new(), RawRequest::new("build X", "a@b.io"))
    }

    fn clean_result() -> ValidationResult {
        ValidationResult {
            score: 1.0,
            violations: Vec::new(),
            rule_set_version: "1".to_string(),
        }
    }

    #[test]
    fn test_no_artifact_is_halted() {
        let mut env = envelope();
        env.push_error(StageError::fatal(
            StageName::Intake,
            ErrorKind::ValidationInput,
            "brief is empty",
        ));

        let snapshot = TerminalSnapshot::from(&env);
        assert_eq!(snapshot.outcome, SnapshotOutcome::Halted);
        assert!(snapshot.artifact.is_none());
        assert_eq!(snapshot.errors.len(), 1);
    }

    #[test]
    fn test_unvalidated_artifact_is_unresolved() {
        let mut env = envelope();
        env.set_artifact(WorkflowArtifact::new("wf")).unwrap();

        assert_eq!(
            TerminalSnapshot::from(&env).outcome,
            SnapshotOutcome::Unresolved
        );
    }

    #[test]
    fn test_clean_artifact_is_validated() {
        let mut env = envelope();
        env.set_artifact(WorkflowArtifact::new("wf")).unwrap();
        env.set_validation(clean_result());

        let snapshot = TerminalSnapshot::from(&env);
        assert_eq!(snapshot.outcome, SnapshotOutcome::Validated);
        assert_eq!(snapshot.validation.unwrap().score, 1.0);
    }

    #[test]
    fn test_fatal_after_validation_is_unresolved() {
        let mut env = envelope();
        env.set_artifact(WorkflowArtifact::new("wf")).unwrap();
        env.set_validation(clean_result());
        env.push_error(StageError::fatal(StageName::Correct, ErrorKind::Cancelled, "deadline"));

        assert_eq!(
            TerminalSnapshot::from(&env).outcome,
            SnapshotOutcome::Unresolved
        );
    }
}
