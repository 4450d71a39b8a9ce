//! Prompt template parsing and rendering
//!
//! Supports variable syntax: `${var:variable-name:default-value}`
//! - `${var:name}` - Required variable, error if not provided
//! - `${var:name:default}` - Optional variable with default value

use std::collections::{HashMap, HashSet};

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use thiserror::Error;

/// Regex to match variable patterns: ${var:name} or ${var:name:default}
static VARIABLE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$\{var:([a-zA-Z0-9][-_a-zA-Z0-9]*)(?::([^}]*))?\}").unwrap()
});

/// Template processing errors
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TemplateError {
    #[error("Missing required variable: {name}")]
    MissingVariable { name: String },

    #[error("Unknown variable '{name}' in {template} template")]
    UnknownVariable { template: String, name: String },
}

/// A parsed variable from a template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptVariable {
    pub name: String,
    pub default: Option<String>,
}

impl PromptVariable {
    pub fn is_required(&self) -> bool {
        self.default.is_none()
    }
}

/// A parsed prompt template
#[derive(Debug, Clone, PartialEq)]
pub struct PromptTemplate {
    content: String,
    variables: Vec<PromptVariable>,
}

impl PromptTemplate {
    /// Parse a template string and extract variables
    pub fn parse(content: impl Into<String>) -> Self {
        let content = content.into();
        let mut variables = Vec::new();
        let mut seen_names = HashSet::new();

        for cap in VARIABLE_PATTERN.captures_iter(&content) {
            let name = cap[1].to_string();

            if !seen_names.insert(name.clone()) {
                continue;
            }

            variables.push(PromptVariable {
                name,
                default: cap.get(2).map(|m| m.as_str().to_string()),
            });
        }

        Self { content, variables }
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn variables(&self) -> &[PromptVariable] {
        &self.variables
    }

    /// Reject variables the caller will never supply
    pub fn ensure_known(&self, template: &str, known: &[&str]) -> Result<(), TemplateError> {
        match self
            .variables
            .iter()
            .find(|v| !known.contains(&v.name.as_str()))
        {
            Some(unknown) => Err(TemplateError::UnknownVariable {
                template: template.to_string(),
                name: unknown.name.clone(),
            }),
            None => Ok(()),
        }
    }

    /// Render the template in a single pass; substituted values are not re-scanned
    pub fn render(&self, values: &HashMap<&str, String>) -> Result<String, TemplateError> {
        if let Some(missing) = self
            .variables
            .iter()
            .find(|v| v.is_required() && !values.contains_key(v.name.as_str()))
        {
            return Err(TemplateError::MissingVariable {
                name: missing.name.clone(),
            });
        }

        let rendered = VARIABLE_PATTERN.replace_all(&self.content, |cap: &Captures| {
            values
                .get(&cap[1])
                .cloned()
                .or_else(|| cap.get(2).map(|m| m.as_str().to_string()))
                .unwrap_or_default()
        });

        Ok(rendered.into_owned())
    }
}
