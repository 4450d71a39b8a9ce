use async_trait::async_trait;
use serde_json::json;
use tracing::info;

use crate::domain::{
    Envelope, ErrorKind, KnowledgeValidator, Severity, Stage, StageContext, StageError, StageName,
};
use crate::infrastructure::observability;

/// Scores the artifact against the knowledge rule set
#[derive(Debug, Clone)]
pub struct ValidateStage {
    validator: KnowledgeValidator,
}

impl ValidateStage {
    pub fn new(validator: KnowledgeValidator) -> Self {
        Self { validator }
    }
}

#[async_trait]
impl Stage for ValidateStage {
    fn name(&self) -> StageName {
        StageName::Validate
    }

    async fn run(&self, mut envelope: Envelope, _ctx: &StageContext) -> Envelope {
        let stage = self.name();

        let Some(artifact) = envelope.artifact() else {
            envelope.push_error(StageError::fatal(
                stage,
                ErrorKind::Structural,
                "no artifact to validate",
            ));
            return envelope;
        };

        let result = self.validator.validate(artifact);
        observability::record_validation_score(result.score);

        info!(
            request_id = %envelope.request_id(),
            score = result.score,
            violations = result.violations.len(),
            critical = result.count_by_severity(Severity::Critical),
            rule_set_version = %result.rule_set_version,
            "Validated artifact"
        );

        let output = json!({
            "score": result.score,
            "violations": result.violations.len(),
            "rule_set_version": result.rule_set_version,
        });

        envelope.set_validation(result);

        if let Err(e) = envelope.record_output(stage, output) {
            envelope.push_error(StageError::fatal(stage, ErrorKind::Structural, e.to_string()));
        }

        envelope
    }
}
