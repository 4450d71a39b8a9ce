//! Rule set inspection and standalone validation

use axum::extract::State;
use serde::{Deserialize, Serialize};

use crate::api::state::AppState;
use crate::api::types::Json;
use crate::domain::knowledge::Rule;
use crate::domain::{AutoCorrector, ValidationResult, WorkflowArtifact};

#[derive(Debug, Serialize)]
pub struct KnowledgeResponse {
    pub version: String,
    pub rules: Vec<Rule>,
}

/// GET /v1/knowledge
pub async fn get_knowledge(State(state): State<AppState>) -> Json<KnowledgeResponse> {
    let rules = state.pipeline.validator().rule_set();

    Json(KnowledgeResponse {
        version: rules.version().to_string(),
        rules: rules.rules().to_vec(),
    })
}

#[derive(Debug, Deserialize)]
pub struct ValidateRequest {
    pub artifact: WorkflowArtifact,
    /// Also run the auto-corrector and report the corrected artifact
    #[serde(default)]
    pub correct: bool,
}

#[derive(Debug, Serialize)]
pub struct ValidateResponse {
    #[serde(flatten)]
    pub result: ValidationResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub corrected: Option<CorrectedArtifact>,
}

#[derive(Debug, Serialize)]
pub struct CorrectedArtifact {
    pub artifact: WorkflowArtifact,
    pub applied_count: u32,
    pub result: ValidationResult,
}

/// POST /v1/validate
pub async fn validate_artifact(
    State(state): State<AppState>,
    Json(request): Json<ValidateRequest>,
) -> Json<ValidateResponse> {
    let validator = state.pipeline.validator();
    let result = validator.validate(&request.artifact);

    let corrected = request.correct.then(|| {
        let report = AutoCorrector::new(validator.clone())
            .correct(&request.artifact, &result.violations);
        let revalidated = validator.validate(&report.artifact);

        CorrectedArtifact {
            artifact: report.artifact,
            applied_count: report.applied_count,
            result: revalidated,
        }
    });

    Json(ValidateResponse { result, corrected })
}
