use thiserror::Error;

/// Errors raised while loading or checking a rule set
#[derive(Debug, Error)]
pub enum KnowledgeError {
    #[error("Failed to read rule set '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse rule set: {0}")]
    Parse(String),

    #[error("Invalid rule '{rule_id}': {message}")]
    InvalidRule { rule_id: String, message: String },

    #[error("Duplicate rule id: {0}")]
    DuplicateRule(String),

    #[error("Rule set version must not be empty")]
    MissingVersion,
}

impl KnowledgeError {
    pub fn invalid_rule(rule_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidRule {
            rule_id: rule_id.into(),
            message: message.into(),
        }
    }
}
