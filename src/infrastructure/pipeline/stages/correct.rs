use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info};

use crate::domain::{
    AutoCorrector, Envelope, ErrorKind, KnowledgeValidator, Stage, StageContext, StageError,
    StageName,
};
use crate::infrastructure::observability;

/// Applies mechanical fixes and re-validates once.
///
/// Whatever violations remain afterwards are surfaced as non-fatal
/// rule-violation errors; this stage never halts on quality.
#[derive(Debug, Clone)]
pub struct CorrectStage {
    validator: KnowledgeValidator,
    corrector: AutoCorrector,
}

impl CorrectStage {
    pub fn new(validator: KnowledgeValidator) -> Self {
        Self {
            corrector: AutoCorrector::new(validator.clone()),
            validator,
        }
    }
}

#[async_trait]
impl Stage for CorrectStage {
    fn name(&self) -> StageName {
        StageName::Correct
    }

    async fn run(&self, mut envelope: Envelope, _ctx: &StageContext) -> Envelope {
        let stage = self.name();

        let (Some(artifact), Some(report)) = (envelope.artifact(), envelope.validation()) else {
            envelope.push_error(StageError::fatal(
                stage,
                ErrorKind::Structural,
                "correction requires a validated artifact",
            ));
            return envelope;
        };

        let correction = self.corrector.correct(artifact, &report.violations);

        for skipped in correction.skipped() {
            debug!(
                request_id = %envelope.request_id(),
                rule_id = %skipped.rule_id,
                outcome = ?skipped.outcome,
                "Fix not applied"
            );
        }

        if correction.applied_count > 0 {
            let corrected = correction.artifact.clone();
            let revalidated = self.validator.validate(&corrected);

            if let Err(e) = envelope.replace_artifact(corrected, correction.applied_count) {
                envelope.push_error(StageError::fatal(stage, ErrorKind::Structural, e.to_string()));
                return envelope;
            }

            observability::record_validation_score(revalidated.score);
            envelope.set_validation(revalidated);
        }

        let output = serde_json::to_value(&correction).unwrap_or(Value::Null);
        if let Err(e) = envelope.record_output(stage, output) {
            envelope.push_error(StageError::fatal(stage, ErrorKind::Structural, e.to_string()));
            return envelope;
        }

        let remaining = envelope
            .validation()
            .map(|report| report.violations.clone())
            .unwrap_or_default();

        info!(
            request_id = %envelope.request_id(),
            applied = correction.applied_count,
            remaining = remaining.len(),
            "Correction pass finished"
        );

        for violation in remaining {
            envelope.push_error(StageError::non_fatal(
                stage,
                ErrorKind::RuleViolation,
                format!("{} ({}): {}", violation.rule_id, violation.severity, violation.message),
            ));
        }

        envelope
    }
}
