//! The envelope aggregate carried through every stage

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::info;

use super::{ErrorKind, RawRequest, RequestId, StageError, StageName};
use crate::domain::artifact::WorkflowArtifact;
use crate::domain::knowledge::{ValidationResult, Violation};

/// Append-only contract violations
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EnvelopeError {
    #[error("stage '{0}' already recorded an output")]
    DuplicateOutput(StageName),

    #[error("stage '{0}' cannot record a stage output")]
    NoOutputSlot(StageName),

    #[error("stage '{reader}' cannot read the output of '{target}'")]
    ForwardRead { reader: StageName, target: StageName },

    #[error("artifact is already set; use replace_artifact")]
    ArtifactAlreadySet,

    #[error("no artifact to replace")]
    NoArtifact,
}

/// Validation state as surfaced to callers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub score: f64,
    pub violations: Vec<Violation>,
    pub corrected_count: u32,
    pub rule_set_version: String,
}

/// Entry and exit time of one stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageTiming {
    pub stage: StageName,
    pub entered_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exited_at: Option<DateTime<Utc>>,
}

impl StageTiming {
    pub fn latency_ms(&self) -> Option<i64> {
        self.exited_at
            .map(|exit| (exit - self.entered_at).num_milliseconds())
    }
}

/// Request state passed from stage to stage.
///
/// Stage outputs, errors and timings only ever grow. The artifact may be
/// replaced once set, but only through [`Envelope::replace_artifact`], which
/// keeps the previous version and bumps the correction counter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    request_id: RequestId,
    raw_request: RawRequest,
    stage_outputs: BTreeMap<StageName, Value>,
    errors: Vec<StageError>,
    #[serde(skip_serializing_if = "Option::is_none")]
    artifact: Option<WorkflowArtifact>,
    #[serde(skip_serializing_if = "Option::is_none")]
    prior_artifact: Option<WorkflowArtifact>,
    #[serde(skip_serializing_if = "Option::is_none")]
    validation: Option<ValidationReport>,
    corrected_count: u32,
    created_at: DateTime<Utc>,
    timestamps: Vec<StageTiming>,
}

impl Envelope {
    pub fn new(request_id: RequestId, raw_request: RawRequest) -> Self {
        Self {
            request_id,
            raw_request,
            stage_outputs: BTreeMap::new(),
            errors: Vec::new(),
            artifact: None,
            prior_artifact: None,
            validation: None,
            corrected_count: 0,
            created_at: Utc::now(),
            timestamps: Vec::new(),
        }
    }

    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    pub fn raw_request(&self) -> &RawRequest {
        &self.raw_request
    }

    pub fn stage_outputs(&self) -> &BTreeMap<StageName, Value> {
        &self.stage_outputs
    }

    pub fn errors(&self) -> &[StageError] {
        &self.errors
    }

    pub fn artifact(&self) -> Option<&WorkflowArtifact> {
        self.artifact.as_ref()
    }

    pub fn prior_artifact(&self) -> Option<&WorkflowArtifact> {
        self.prior_artifact.as_ref()
    }

    pub fn validation(&self) -> Option<&ValidationReport> {
        self.validation.as_ref()
    }

    pub fn corrected_count(&self) -> u32 {
        self.corrected_count
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn timestamps(&self) -> &[StageTiming] {
        &self.timestamps
    }

    /// Record a stage's own output; each stage writes at most once
    pub fn record_output(&mut self, stage: StageName, output: Value) -> Result<(), EnvelopeError> {
        if stage == StageName::Intake {
            return Err(EnvelopeError::NoOutputSlot(stage));
        }

        if self.stage_outputs.contains_key(&stage) {
            return Err(EnvelopeError::DuplicateOutput(stage));
        }

        self.stage_outputs.insert(stage, output);
        Ok(())
    }

    /// Read an earlier stage's output on behalf of `reader`
    pub fn output_of(&self, reader: StageName, target: StageName) -> Result<Option<&Value>, EnvelopeError> {
        if target >= reader {
            return Err(EnvelopeError::ForwardRead { reader, target });
        }

        Ok(self.stage_outputs.get(&target))
    }

    pub fn push_error(&mut self, mut error: StageError) {
        if error.kind == ErrorKind::RuleViolation {
            error.fatal = false;
        }

        self.errors.push(error);
    }

    pub fn has_fatal(&self) -> bool {
        self.errors.iter().any(|e| e.fatal)
    }

    pub fn fatal_error(&self) -> Option<&StageError> {
        self.errors.iter().find(|e| e.fatal)
    }

    /// Populate the artifact for the first time
    pub fn set_artifact(&mut self, artifact: WorkflowArtifact) -> Result<(), EnvelopeError> {
        if self.artifact.is_some() {
            return Err(EnvelopeError::ArtifactAlreadySet);
        }

        self.artifact = Some(artifact);
        Ok(())
    }

    /// Swap in a corrected artifact, keeping the previous one
    pub fn replace_artifact(
        &mut self,
        corrected: WorkflowArtifact,
        applied_fixes: u32,
    ) -> Result<(), EnvelopeError> {
        let previous = self.artifact.take().ok_or(EnvelopeError::NoArtifact)?;

        self.corrected_count += applied_fixes;

        info!(
            request_id = %self.request_id,
            applied_fixes,
            corrected_count = self.corrected_count,
            nodes_before = previous.nodes.len(),
            nodes_after = corrected.nodes.len(),
            "Replaced artifact with corrected version"
        );

        self.prior_artifact = Some(previous);
        self.artifact = Some(corrected);
        Ok(())
    }

    pub fn set_validation(&mut self, result: ValidationResult) {
        self.validation = Some(ValidationReport {
            score: result.score,
            violations: result.violations,
            corrected_count: self.corrected_count,
            rule_set_version: result.rule_set_version,
        });
    }

    pub fn enter_stage(&mut self, stage: StageName) {
        self.timestamps.push(StageTiming {
            stage,
            entered_at: Utc::now(),
            exited_at: None,
        });
    }

    pub fn exit_stage(&mut self, stage: StageName) {
        if let Some(timing) = self
            .timestamps
            .iter_mut()
            .rev()
            .find(|t| t.stage == stage && t.exited_at.is_none())
        {
            timing.exited_at = Some(Utc::now());
        }
    }

    /// Per-stage latency in milliseconds, for stages that have exited
    pub fn stage_latencies(&self) -> BTreeMap<StageName, i64> {
        self.timestamps
            .iter()
            .filter_map(|t| t.latency_ms().map(|ms| (t.stage, ms)))
            .collect()
    }

    /// Time from envelope creation to the last stage exit
    pub fn total_latency_ms(&self) -> i64 {
        self.timestamps
            .iter()
            .filter_map(|t| t.exited_at)
            .max()
            .map(|last| (last - self.created_at).num_milliseconds())
            .unwrap_or(0)
    }
}
