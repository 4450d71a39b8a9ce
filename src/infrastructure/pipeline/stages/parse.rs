use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tracing::warn;

use super::model::{ModelOutput, ModelStageDeps};
use crate::domain::{
    Envelope, ErrorKind, ParsedOutput, Stage, StageContext, StageError, StageName,
};

/// Extracts structured requirements from the brief
#[derive(Debug, Clone)]
pub struct ParseStage {
    deps: ModelStageDeps,
}

impl ParseStage {
    pub fn new(deps: ModelStageDeps) -> Self {
        Self { deps }
    }
}

#[async_trait]
impl Stage for ParseStage {
    fn name(&self) -> StageName {
        StageName::Parse
    }

    async fn run(&self, mut envelope: Envelope, ctx: &StageContext) -> Envelope {
        let stage = self.name();
        let values = HashMap::from([("brief", envelope.raw_request().brief.clone())]);

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
            warn!(request_id = %envelope.request_id(), reason = %reason, "Requirements output was not JSON");
            envelope.push_error(StageError::non_fatal(
                stage,
                ErrorKind::MalformedOutput,
                format!("requirements could not be parsed: {}", reason),
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
