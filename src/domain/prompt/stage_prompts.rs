//! Prompts for the model-calling stages

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::{PromptTemplate, TemplateError};
use crate::domain::envelope::StageName;

pub const PARSE_SYSTEM: &str = "You are a requirements analyst for a no-code workflow platform. \
Answer with a single JSON object and nothing else.";

pub const DESIGN_SYSTEM: &str = "You are a workflow architect for a no-code automation platform. \
Answer with a single JSON object and nothing else.";

pub const SYNTHESIZE_SYSTEM: &str = "You generate importable workflow definitions. \
Answer with a single JSON object of the form \
{\"name\": string, \"nodes\": [{\"name\": string, \"type\": string, \"parameters\": object}], \
\"connections\": [{\"from\": string, \"to\": string}], \"settings\": object}.";

pub const DEFAULT_PARSE_TEMPLATE: &str = "Extract the requirements from this automation request.

Request:
${var:brief}

Return JSON with the keys: goal, trigger, inputs, outputs, integrations, constraints.";

pub const DEFAULT_DESIGN_TEMPLATE: &str = "Design the workflow for the requirements below.

Original request:
${var:brief}

Requirements:
${var:requirements:none extracted, work from the request}

Return JSON with the keys: trigger, steps (ordered, each with name, type and purpose), error_handling.";

pub const DEFAULT_SYNTHESIZE_TEMPLATE: &str = "Produce the workflow JSON for this design.

Original request:
${var:brief}

Requirements:
${var:requirements:none extracted}

Design:
${var:design:none available, design it from the request}

Every node needs a unique name. Start with a trigger node and connect every other node.";

/// Template overrides from configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptOverrides {
    pub parse: Option<String>,
    pub design: Option<String>,
    pub synthesize: Option<String>,
}

/// System prompt plus user template for one stage
#[derive(Debug, Clone, PartialEq)]
pub struct StagePrompt {
    pub system: &'static str,
    pub template: PromptTemplate,
}

/// Prompts for every model-calling stage, checked at startup
#[derive(Debug, Clone, PartialEq)]
pub struct StagePrompts {
    parse: StagePrompt,
    design: StagePrompt,
    synthesize: StagePrompt,
}

impl StagePrompts {
    pub fn new(overrides: &PromptOverrides) -> Result<Self, TemplateError> {
        let build = |stage: StageName, system, custom: &Option<String>, default: &str, known: &[&str]| {
            let template = PromptTemplate::parse(custom.as_deref().unwrap_or(default));
            template.ensure_known(stage.as_str(), known)?;
            Ok::<_, TemplateError>(StagePrompt { system, template })
        };

        Ok(Self {
            parse: build(
                StageName::Parse,
                PARSE_SYSTEM,
                &overrides.parse,
                DEFAULT_PARSE_TEMPLATE,
                &["brief"],
            )?,
            design: build(
                StageName::Design,
                DESIGN_SYSTEM,
                &overrides.design,
                DEFAULT_DESIGN_TEMPLATE,
                &["brief", "requirements"],
            )?,
            synthesize: build(
                StageName::Synthesize,
                SYNTHESIZE_SYSTEM,
                &overrides.synthesize,
                DEFAULT_SYNTHESIZE_TEMPLATE,
                &["brief", "requirements", "design"],
            )?,
        })
    }

    pub fn for_stage(&self, stage: StageName) -> Option<&StagePrompt> {
        match stage {
            StageName::Parse => Some(&self.parse),
            StageName::Design => Some(&self.design),
            StageName::Synthesize => Some(&self.synthesize),
            _ => None,
        }
    }
}

impl Default for StagePrompts {
    fn default() -> Self {
        let builtin = |system, content: &str| StagePrompt {
            system,
            template: PromptTemplate::parse(content),
        };

        Self {
            parse: builtin(PARSE_SYSTEM, DEFAULT_PARSE_TEMPLATE),
            design: builtin(DESIGN_SYSTEM, DEFAULT_DESIGN_TEMPLATE),
            synthesize: builtin(SYNTHESIZE_SYSTEM, DEFAULT_SYNTHESIZE_TEMPLATE),
        }
    }
}

impl StagePrompt {
    pub fn render(&self, values: &HashMap<&str, String>) -> Result<String, TemplateError> {
        self.template.render(values)
    }
}
