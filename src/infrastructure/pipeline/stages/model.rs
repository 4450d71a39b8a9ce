//! Shared plumbing of the model-calling stages

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::config::StageTimeouts;
use crate::domain::{
    Envelope, ErrorKind, Fingerprint, GenerationClient, LlmRequest, ResponseCache, StageContext,
    StageError, StageName, StagePrompts,
};
use crate::infrastructure::observability;

/// Where a stage's model output came from
pub(super) enum ModelOutput {
    /// Stage output stored by an earlier request
    Cached(Value),
    /// Fresh completion text
    Generated(String),
}

pub(super) struct Fetched {
    pub fingerprint: Fingerprint,
    pub output: ModelOutput,
}

/// Dependencies shared by parse, design and synthesize
#[derive(Clone)]
pub struct ModelStageDeps {
    generation: Arc<dyn GenerationClient>,
    cache: Option<ResponseCache>,
    prompts: Arc<StagePrompts>,
    timeouts: StageTimeouts,
}

impl fmt::Debug for ModelStageDeps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelStageDeps")
            .field("cache", &self.cache)
            .field("timeouts", &self.timeouts)
            .finish_non_exhaustive()
    }
}

impl ModelStageDeps {
    pub fn new(
        generation: Arc<dyn GenerationClient>,
        prompts: Arc<StagePrompts>,
        timeouts: StageTimeouts,
    ) -> Self {
        Self {
            generation,
            cache: None,
            prompts,
            timeouts,
        }
    }

    pub fn with_cache(mut self, cache: ResponseCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Render the stage prompt, then serve it from the cache or the model.
    ///
    /// High-priority requests skip the cache lookup entirely.
    pub(super) async fn fetch(
        &self,
        stage: StageName,
        envelope: &Envelope,
        values: HashMap<&str, String>,
        ctx: &StageContext,
    ) -> Result<Fetched, StageError> {
        let prompt = self.prompts.for_stage(stage).ok_or_else(|| {
            StageError::fatal(stage, ErrorKind::Structural, "stage has no prompt template")
        })?;

        let user = prompt.render(&values).map_err(|e| {
            StageError::fatal(stage, ErrorKind::Structural, format!("prompt rendering failed: {}", e))
        })?;

        let fingerprint = Fingerprint::compute(stage, &user);

        if let Some(cached) = self.lookup(stage, envelope, &fingerprint).await {
            return Ok(Fetched {
                fingerprint,
                output: ModelOutput::Cached(cached),
            });
        }

        let request = LlmRequest::builder().system(prompt.system).user(user).build();

        let response = self
            .generation
            .invoke(stage, request, self.timeouts.for_stage(stage), ctx.cancel_token())
            .await
            .map_err(|e| StageError::fatal(stage, e.kind(), e.to_string()))?;

        Ok(Fetched {
            fingerprint,
            output: ModelOutput::Generated(response.content().to_string()),
        })
    }

    async fn lookup(
        &self,
        stage: StageName,
        envelope: &Envelope,
        fingerprint: &Fingerprint,
    ) -> Option<Value> {
        let cache = self.cache.as_ref()?;

        if envelope.raw_request().priority.bypasses_cache() {
            return None;
        }

        let lookup = cache.get(fingerprint).await;
        observability::record_cache_lookup(stage, lookup.label());
        debug!(
            request_id = %envelope.request_id(),
            stage = %stage,
            result = lookup.label(),
            "Response cache lookup"
        );

        lookup.into_output()
    }

    /// Store a clean stage output; high-priority results are never written
    pub(super) async fn remember(
        &self,
        stage: StageName,
        envelope: &Envelope,
        fingerprint: Fingerprint,
        output: Value,
    ) {
        let Some(cache) = self.cache.as_ref() else {
            return;
        };

        if envelope.raw_request().priority.bypasses_cache() {
            return;
        }

        cache.put(fingerprint, stage, output, None).await;
    }
}

/// Prior stage output rendered as prompt text.
///
/// A missing output is recorded as a non-fatal structural error; the stage
/// carries on with the template default.
pub(super) fn prior_output_text(
    envelope: &mut Envelope,
    reader: StageName,
    target: StageName,
) -> Option<String> {
    let found = match envelope.output_of(reader, target) {
        Ok(found) => found.cloned(),
        Err(e) => {
            envelope.push_error(StageError::non_fatal(reader, ErrorKind::Structural, e.to_string()));
            return None;
        }
    };

    let Some(value) = found else {
        envelope.push_error(StageError::non_fatal(
            reader,
            ErrorKind::Structural,
            format!("no {} output available", target),
        ));
        return None;
    };

    Some(render_output(&value))
}

/// Parsed JSON is pretty-printed; unparsed model text is passed on as is
fn render_output(value: &Value) -> String {
    match value.get("status").and_then(Value::as_str) {
        Some("json") => value
            .get("value")
            .map(|v| serde_json::to_string_pretty(v).unwrap_or_else(|_| v.to_string()))
            .unwrap_or_default(),
        Some("parse_error") => value
            .get("raw_text")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        _ => serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::domain::{RawRequest, RequestId};

    #[test]
    fn test_render_output_variants() {
        let parsed = json!({"status": "json", "value": {"goal": "sync"}});
        assert!(render_output(&parsed).contains("\"goal\": \"sync\""));

        let raw = json!({"status": "parse_error", "raw_text": "just prose", "reason": "x"});
        assert_eq!(render_output(&raw), "just prose");
    }

    #[test]
    fn test_missing_prior_output_is_non_fatal() {
        let mut envelope = Envelope::new(
            RequestId::new(),
            RawRequest::new("sync the crm nightly", "ops@example.com"),
        );

        let text = prior_output_text(&mut envelope, StageName::Design, StageName::Parse);

        assert!(text.is_none());
        assert_eq!(envelope.errors().len(), 1);
        assert_eq!(envelope.errors()[0].kind, ErrorKind::Structural);
        assert!(!envelope.has_fatal());
    }
}
