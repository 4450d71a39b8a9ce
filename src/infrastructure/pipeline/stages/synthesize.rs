use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{info, warn};

use super::model::{prior_output_text, ModelOutput, ModelStageDeps};
use crate::domain::{
    Envelope, ErrorKind, ParsedArtifact, Stage, StageContext, StageError, StageName,
};

/// Produces the importable workflow artifact.
///
/// Unlike the earlier model stages, output that does not describe a workflow
/// halts the run: there is nothing to validate without an artifact.
#[derive(Debug, Clone)]
pub struct SynthesizeStage {
    deps: ModelStageDeps,
}

impl SynthesizeStage {
    pub fn new(deps: ModelStageDeps) -> Self {
        Self { deps }
    }
}

#[async_trait]
impl Stage for SynthesizeStage {
    fn name(&self) -> StageName {
        StageName::Synthesize
    }

    async fn run(&self, mut envelope: Envelope, ctx: &StageContext) -> Envelope {
        let stage = self.name();

        let mut values = HashMap::from([("brief", envelope.raw_request().brief.clone())]);
        if let Some(requirements) = prior_output_text(&mut envelope, stage, StageName::Parse) {
            values.insert("requirements", requirements);
        }
        if let Some(design) = prior_output_text(&mut envelope, stage, StageName::Design) {
            values.insert("design", design);
        }

        let fetched = match self.deps.fetch(stage, &envelope, values, ctx).await {
            Ok(fetched) => fetched,
            Err(error) => {
                envelope.push_error(error);
                return envelope;
            }
        };

        let parsed = match fetched.output {
            ModelOutput::Cached(value) => ParsedArtifact::from_value(value),
            ModelOutput::Generated(text) => ParsedArtifact::from_model_output(&text),
        };

        let artifact = match parsed {
            ParsedArtifact::Parsed(artifact) => artifact,
            ParsedArtifact::ParseError { raw_text, reason } => {
                warn!(request_id = %envelope.request_id(), reason = %reason, "Synthesized output is not a workflow");
                let output = json!({"status": "parse_error", "raw_text": raw_text, "reason": reason});
                if let Err(e) = envelope.record_output(stage, output) {
                    envelope.push_error(StageError::non_fatal(stage, ErrorKind::Structural, e.to_string()));
                }
                envelope.push_error(StageError::fatal(
                    stage,
                    ErrorKind::MalformedOutput,
                    format!("artifact could not be parsed: {}", reason),
                ));
                return envelope;
            }
        };

        info!(
            request_id = %envelope.request_id(),
            workflow = %artifact.name,
            nodes = artifact.nodes.len(),
            "Synthesized workflow artifact"
        );

        let output = serde_json::to_value(&artifact).unwrap_or(Value::Null);
        self.deps
            .remember(stage, &envelope, fetched.fingerprint, output.clone())
            .await;

        if let Err(e) = envelope
            .record_output(stage, output)
            .and_then(|_| envelope.set_artifact(artifact))
        {
            envelope.push_error(StageError::fatal(stage, ErrorKind::Structural, e.to_string()));
        }

        envelope
    }
}
