use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tracing::warn;

use super::model::{prior_output_text, ModelOutput, ModelStageDeps};
use crate::domain::{
    Envelope, ErrorKind, ParsedOutput, Stage, StageContext, StageError, StageName,
};

/// Turns requirements into an ordered step design
#[derive(Debug, Clone)]
pub struct DesignStage {
    deps: ModelStageDeps,
}

impl DesignStage {
    pub fn new(deps: ModelStageDeps) -> Self {
        Self { deps }
    }
}

#[async_trait]
impl Stage for DesignStage {
    fn name(&self) -> StageName {
        StageName::Design
    }

    async fn run(&self, mut envelope: Envelope, ctx: &StageContext) -> Envelope {
        let stage = self.name();

        let mut values = HashMap::from([("brief", envelope.raw_request().brief.clone())]);
        if let Some(requirements) = prior_output_text(&mut envelope, stage, StageName::Parse) {
            values.insert("requirements", requirements);
        }

        let fetched = match self.deps.fetch(stage, &envelope, values, ctx).await {
            Ok(fetched) => fetched,
            Err(error) => {
                envelope.push_error(error);
                return envelope;
            }
        };

        let parsed = match fetched.output {
            ModelOutput::Cached(value) => serde_json::from_value(value).unwrap_or_else(|e| {
                ParsedOutput::ParseError {
                    raw_text: String::new(),
                    reason: format!("unreadable cache entry: {}", e),
                }
            }),
            ModelOutput::Generated(text) => ParsedOutput::from_model_output(&text),
        };

        if let ParsedOutput::ParseError { reason, .. } = &parsed {
            warn!(request_id = %envelope.request_id(), reason = %reason, "Design output was not JSON");
            envelope.push_error(StageError::non_fatal(
                stage,
                ErrorKind::MalformedOutput,
                format!("design could not be parsed: {}", reason),
            ));
        }

        let output = serde_json::to_value(&parsed).unwrap_or(Value::Null);

        if matches!(parsed, ParsedOutput::Json { .. }) {
            self.deps
                .remember(stage, &envelope, fetched.fingerprint, output.clone())
                .await;
        }

        if let Err(e) = envelope.record_output(stage, output) {
            envelope.push_error(StageError::fatal(stage, ErrorKind::Structural, e.to_string()));
        }

        envelope
    }
}
