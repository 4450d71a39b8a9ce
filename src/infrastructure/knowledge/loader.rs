use std::path::Path;

use tracing::info;

use crate::domain::knowledge::{KnowledgeError, RuleSet, RuleSetFormat};

/// Read and check a rule file. TOML or JSON, chosen by extension.
pub fn load_rule_set(path: &Path) -> Result<RuleSet, KnowledgeError> {
    let content = std::fs::read_to_string(path).map_err(|source| KnowledgeError::Io {
        path: path.display().to_string(),
        source,
    })?;

    let rule_set = RuleSet::parse(&content, RuleSetFormat::from_path(path))?;

    info!(
        path = %path.display(),
        version = rule_set.version(),
        rules = rule_set.len(),
        "Knowledge base loaded"
    );

    Ok(rule_set)
}
