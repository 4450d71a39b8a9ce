//! Tolerant parsing of model output
//!
//! Models wrap JSON in Markdown fences or surround it with prose. The parsers
//! here pull out the first JSON block and report anything else as a
//! `ParseError` carrying the raw text for audit.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::WorkflowArtifact;

/// Structured output of an intermediate stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ParsedOutput {
    Json { value: Value },
    ParseError { raw_text: String, reason: String },
}

impl ParsedOutput {
    pub fn from_model_output(text: &str) -> Self {
        let Some(block) = extract_json_block(text) else {
            return Self::ParseError {
                raw_text: text.to_string(),
                reason: "no JSON object found in model output".to_string(),
            };
        };

        match serde_json::from_str::<Value>(block) {
            Ok(value) if value.is_object() || value.is_array() => Self::Json { value },
            Ok(_) => Self::ParseError {
                raw_text: text.to_string(),
                reason: "model output is not a JSON object or array".to_string(),
            },
            Err(e) => Self::ParseError {
                raw_text: text.to_string(),
                reason: format!("invalid JSON: {}", e),
            },
        }
    }
}

/// Synthesized artifact as returned by the model
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedArtifact {
    Parsed(WorkflowArtifact),
    ParseError { raw_text: String, reason: String },
}

impl ParsedArtifact {
    pub fn from_model_output(text: &str) -> Self {
        let Some(block) = extract_json_block(text) else {
            return Self::ParseError {
                raw_text: text.to_string(),
                reason: "no JSON object found in model output".to_string(),
            };
        };

        match serde_json::from_str::<WorkflowArtifact>(block) {
            Ok(artifact) => Self::Parsed(artifact),
            Err(e) => Self::ParseError {
                raw_text: text.to_string(),
                reason: format!("output does not describe a workflow: {}", e),
            },
        }
    }

    /// Parse a previously stored stage output (e.g. a cache hit)
    pub fn from_value(value: Value) -> Self {
        let raw_text = value.to_string();

        match serde_json::from_value::<WorkflowArtifact>(value) {
            Ok(artifact) => Self::Parsed(artifact),
            Err(e) => Self::ParseError {
                raw_text,
                reason: format!("stored output does not describe a workflow: {}", e),
            },
        }
    }
}

/// Locate the JSON payload inside free-form model text.
///
/// Prefers the contents of the first fenced code block; otherwise takes the
/// span between the first `{` and the last `}`.
pub fn extract_json_block(text: &str) -> Option<&str> {
    if let Some(fenced) = fenced_block(text) {
        let trimmed = fenced.trim();

        if trimmed.starts_with('{') || trimmed.starts_with('[') {
            return Some(trimmed);
        }
    }

    let start = text.find('{')?;
    let end = text.rfind('}')?;

    if end > start {
        Some(&text[start..=end])
    } else {
        None
    }
}

fn fenced_block(text: &str) -> Option<&str> {
    let open = text.find("```")?;
    let after_fence = &text[open + 3..];
    // Skip the info string (e.g. "json") up to the end of the line
    let body_start = after_fence.find('\n')? + 1;
    let body = &after_fence[body_start..];
    let close = body.find("```")?;

    Some(&body[..close])
}
