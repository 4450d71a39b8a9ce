//! Versioned, immutable rule set

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{KnowledgeError, Rule};

/// Serialization format of a rule set document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleSetFormat {
    Toml,
    Json,
}

impl RuleSetFormat {
    /// Pick the format from a file extension, defaulting to TOML
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Toml,
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
struct RuleSetDocument {
    version: String,
    #[serde(default)]
    rules: Vec<Rule>,
}

/// The knowledge base: loaded once, shared by reference, never mutated
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleSet {
    version: String,
    rules: Vec<Rule>,
}

impl RuleSet {
    /// Build a rule set, checking ids and fix compatibility
    pub fn new(version: impl Into<String>, rules: Vec<Rule>) -> Result<Self, KnowledgeError> {
        let version = version.into();

        if version.trim().is_empty() {
            return Err(KnowledgeError::MissingVersion);
        }

        let mut ids = HashSet::new();

        for rule in &rules {
            if rule.id.trim().is_empty() {
                return Err(KnowledgeError::invalid_rule("<empty>", "rule id must not be empty"));
            }

            if !ids.insert(rule.id.as_str()) {
                return Err(KnowledgeError::DuplicateRule(rule.id.clone()));
            }

            if let Some(ref fix) = rule.suggested_fix {
                if !fix.supports(&rule.predicate) {
                    return Err(KnowledgeError::invalid_rule(
                        &rule.id,
                        "suggested fix cannot be applied to this predicate",
                    ));
                }
            }
        }

        Ok(Self { version, rules })
    }

    /// An empty rule set; every artifact scores 1.0 against it
    pub fn empty(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            rules: Vec::new(),
        }
    }

    pub fn parse(content: &str, format: RuleSetFormat) -> Result<Self, KnowledgeError> {
        let document: RuleSetDocument = match format {
            RuleSetFormat::Toml => {
                toml::from_str(content).map_err(|e| KnowledgeError::Parse(e.to_string()))?
            }
            RuleSetFormat::Json => {
                serde_json::from_str(content).map_err(|e| KnowledgeError::Parse(e.to_string()))?
            }
        };

        Self::new(document.version, document.rules)
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn get(&self, id: &str) -> Option<&Rule> {
        self.rules.iter().find(|r| r.id == id)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::knowledge::{FixTemplate, RulePredicate, Severity};

    const TOML_RULES: &str = r#"
version = "2024.10"

[[rules]]
id = "WF-001"
severity = "critical"
message = "Workflow must start with a trigger"

[rules.predicate]
kind = "requires_trigger"
trigger_types = ["webhook", "manualTrigger"]

[rules.fix]
kind = "add_node"
node = { name = "Manual Trigger", type = "manualTrigger" }

[[rules]]
id = "WF-010"
severity = "minor"
message = "Workflow names start with a capital letter"

[rules.predicate]
kind = "name_pattern"
pattern = "^[A-Z]"
"#;

    #[test]
    fn test_parse_toml() {
        let rule_set = RuleSet::parse(TOML_RULES, RuleSetFormat::Toml).unwrap();

        assert_eq!(rule_set.version(), "2024.10");
        assert_eq!(rule_set.len(), 2);

        let first = rule_set.get("WF-001").unwrap();
        assert_eq!(first.severity, Severity::Critical);
        assert!(matches!(first.suggested_fix, Some(FixTemplate::AddNode { .. })));
        assert!(rule_set.get("WF-010").unwrap().suggested_fix.is_none());
    }

    #[test]
    fn test_parse_json() {
        let json = r#"{
            "version": "7",
            "rules": [{
                "id": "WF-002",
                "severity": "major",
                "message": "No dangling connections",
                "predicate": {"kind": "no_dangling_connections"},
                "suggested_fix": {"kind": "remove_offender"}
            }]
        }"#;

        let rule_set = RuleSet::parse(json, RuleSetFormat::Json).unwrap();
        assert_eq!(rule_set.version(), "7");
        assert_eq!(rule_set.rules()[0].predicate, RulePredicate::NoDanglingConnections);
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let rule = Rule::new("A", Severity::Minor, RulePredicate::UniqueNodeNames, "m");
        let result = RuleSet::new("1", vec![rule.clone(), rule]);

        assert!(matches!(result, Err(KnowledgeError::DuplicateRule(id)) if id == "A"));
    }

    #[test]
    fn test_incompatible_fix_rejected() {
        let rule = Rule::new("A", Severity::Minor, RulePredicate::UniqueNodeNames, "m")
            .with_fix(FixTemplate::RemoveOffender);

        assert!(matches!(
            RuleSet::new("1", vec![rule]),
            Err(KnowledgeError::InvalidRule { .. })
        ));
    }

    #[test]
    fn test_missing_version_rejected() {
        assert!(matches!(
            RuleSet::new("  ", Vec::new()),
            Err(KnowledgeError::MissingVersion)
        ));
    }

    #[test]
    fn test_invalid_regex_is_a_parse_error() {
        let content = r#"
version = "1"
[[rules]]
id = "X"
severity = "minor"
message = "m"
[rules.predicate]
kind = "name_pattern"
pattern = "(["
"#;

        assert!(matches!(
            RuleSet::parse(content, RuleSetFormat::Toml),
            Err(KnowledgeError::Parse(_))
        ));
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(RuleSetFormat::from_path(Path::new("rules.json")), RuleSetFormat::Json);
        assert_eq!(RuleSetFormat::from_path(Path::new("rules.toml")), RuleSetFormat::Toml);
        assert_eq!(RuleSetFormat::from_path(Path::new("rules")), RuleSetFormat::Toml);
    }
}
