//! Rule entity, predicates and fix templates

use std::collections::BTreeSet;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::artifact::{StructuralPatch, WorkflowArtifact, WorkflowNode};

/// Rule severity, ordered from least to most severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Minor,
    Major,
    Critical,
}

impl Severity {
    /// Score deduction for a single violation of this severity
    pub fn penalty(&self) -> f64 {
        match self {
            Self::Critical => 0.5,
            Self::Major => 0.2,
            Self::Minor => 0.05,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::Major => "major",
            Self::Minor => "minor",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Compiled regular expression that serializes as its source
#[derive(Debug, Clone)]
pub struct NamePattern(Regex);

impl NamePattern {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Regex::new(pattern).map(Self)
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.0.is_match(text)
    }
}

impl PartialEq for NamePattern {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl TryFrom<String> for NamePattern {
    type Error = regex::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl Serialize for NamePattern {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for NamePattern {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let source = String::deserialize(deserializer)?;
        Self::try_from(source).map_err(serde::de::Error::custom)
    }
}

/// What part of the artifact a finding refers to
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "scope", rename_all = "snake_case")]
pub enum FindingTarget {
    Workflow,
    Node { name: String },
    Connection { from: String, to: String },
    Setting { key: String },
    Parameter { node: String, parameter: String },
}

/// A single predicate failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub target: FindingTarget,
    pub detail: String,
}

impl Finding {
    fn new(target: FindingTarget, detail: impl Into<String>) -> Self {
        Self {
            target,
            detail: detail.into(),
        }
    }
}

/// Closed set of checks a rule can perform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RulePredicate {
    MinNodes { min: usize },
    MaxNodes { max: usize },
    RequiresTrigger { trigger_types: Vec<String> },
    UniqueNodeNames,
    NoDanglingConnections,
    NoOrphanNodes { trigger_types: Vec<String> },
    RequiredParameter { node_type: String, parameter: String },
    ForbiddenNodeType { node_type: String },
    RequiredSetting { key: String },
    NamePattern { pattern: NamePattern },
}

impl RulePredicate {
    /// Evaluate against an artifact; an empty result means the rule holds
    pub fn evaluate(&self, artifact: &WorkflowArtifact) -> Vec<Finding> {
        match self {
            Self::MinNodes { min } => {
                if artifact.nodes.len() < *min {
                    vec![Finding::new(
                        FindingTarget::Workflow,
                        format!("{} nodes, at least {} required", artifact.nodes.len(), min),
                    )]
                } else {
                    Vec::new()
                }
            }
            Self::MaxNodes { max } => {
                if artifact.nodes.len() > *max {
                    vec![Finding::new(
                        FindingTarget::Workflow,
                        format!("{} nodes, at most {} allowed", artifact.nodes.len(), max),
                    )]
                } else {
                    Vec::new()
                }
            }
            Self::RequiresTrigger { trigger_types } => {
                let has_trigger = artifact
                    .nodes
                    .iter()
                    .any(|n| trigger_types.iter().any(|t| t == &n.node_type));

                if has_trigger {
                    Vec::new()
                } else {
                    vec![Finding::new(FindingTarget::Workflow, "no trigger node")]
                }
            }
            Self::UniqueNodeNames => {
                let mut seen = BTreeSet::new();
                let mut duplicates = BTreeSet::new();

                for node in &artifact.nodes {
                    if !seen.insert(node.name.as_str()) {
                        duplicates.insert(node.name.as_str());
                    }
                }

                duplicates
                    .into_iter()
                    .map(|name| {
                        Finding::new(
                            FindingTarget::Node {
                                name: name.to_string(),
                            },
                            format!("node name '{}' is used more than once", name),
                        )
                    })
                    .collect()
            }
            Self::NoDanglingConnections => artifact
                .connections
                .iter()
                .filter(|c| !artifact.has_node(&c.from) || !artifact.has_node(&c.to))
                .map(|c| {
                    Finding::new(
                        FindingTarget::Connection {
                            from: c.from.clone(),
                            to: c.to.clone(),
                        },
                        format!("connection '{}' -> '{}' references a missing node", c.from, c.to),
                    )
                })
                .collect(),
            Self::NoOrphanNodes { trigger_types } => {
                if artifact.nodes.len() < 2 {
                    return Vec::new();
                }

                artifact
                    .nodes
                    .iter()
                    .filter(|n| !trigger_types.iter().any(|t| t == &n.node_type))
                    .filter(|n| artifact.incoming_count(&n.name) == 0)
                    .map(|n| {
                        Finding::new(
                            FindingTarget::Node {
                                name: n.name.clone(),
                            },
                            format!("node '{}' is never reached", n.name),
                        )
                    })
                    .collect()
            }
            Self::RequiredParameter {
                node_type,
                parameter,
            } => artifact
                .nodes
                .iter()
                .filter(|n| &n.node_type == node_type && !n.has_parameter(parameter))
                .map(|n| {
                    Finding::new(
                        FindingTarget::Parameter {
                            node: n.name.clone(),
                            parameter: parameter.clone(),
                        },
                        format!("node '{}' is missing '{}'", n.name, parameter),
                    )
                })
                .collect(),
            Self::ForbiddenNodeType { node_type } => artifact
                .nodes
                .iter()
                .filter(|n| &n.node_type == node_type)
                .map(|n| {
                    Finding::new(
                        FindingTarget::Node {
                            name: n.name.clone(),
                        },
                        format!("node '{}' uses forbidden type '{}'", n.name, node_type),
                    )
                })
                .collect(),
            Self::RequiredSetting { key } => {
                if artifact.settings.contains_key(key) {
                    Vec::new()
                } else {
                    vec![Finding::new(
                        FindingTarget::Setting { key: key.clone() },
                        format!("setting '{}' is not set", key),
                    )]
                }
            }
            Self::NamePattern { pattern } => {
                if pattern.is_match(&artifact.name) {
                    Vec::new()
                } else {
                    vec![Finding::new(
                        FindingTarget::Workflow,
                        format!("name '{}' does not match '{}'", artifact.name, pattern.as_str()),
                    )]
                }
            }
        }
    }
}

/// Fix attached to a concrete violation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SuggestedFix {
    Patch { patch: StructuralPatch },
    Advice { text: String },
}

impl SuggestedFix {
    /// Only structural patches are applied automatically
    pub fn is_mechanical(&self) -> bool {
        matches!(self, Self::Patch { .. })
    }

    pub fn patch(&self) -> Option<&StructuralPatch> {
        match self {
            Self::Patch { patch } => Some(patch),
            Self::Advice { .. } => None,
        }
    }
}

/// Fix as written in the knowledge base, bound to a finding at validation time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FixTemplate {
    SetParameter { value: Value },
    RemoveOffender,
    SetSetting { value: Value },
    AddNode { node: WorkflowNode },
    RenameWorkflow { name: String },
    Advice { text: String },
}

impl FixTemplate {
    /// Whether this template can be bound to the findings of `predicate`
    pub fn supports(&self, predicate: &RulePredicate) -> bool {
        match self {
            Self::Advice { .. } => true,
            Self::SetParameter { .. } => matches!(predicate, RulePredicate::RequiredParameter { .. }),
            Self::RemoveOffender => matches!(
                predicate,
                RulePredicate::ForbiddenNodeType { .. }
                    | RulePredicate::NoDanglingConnections
                    | RulePredicate::NoOrphanNodes { .. }
            ),
            Self::SetSetting { .. } => matches!(predicate, RulePredicate::RequiredSetting { .. }),
            Self::AddNode { .. } => matches!(predicate, RulePredicate::RequiresTrigger { .. }),
            Self::RenameWorkflow { .. } => matches!(predicate, RulePredicate::NamePattern { .. }),
        }
    }

    /// Bind the template to a finding, producing a concrete fix
    pub fn bind(&self, target: &FindingTarget, artifact: &WorkflowArtifact) -> Option<SuggestedFix> {
        let patch = match (self, target) {
            (Self::Advice { text }, _) => {
                return Some(SuggestedFix::Advice { text: text.clone() });
            }
            (Self::SetParameter { value }, FindingTarget::Parameter { node, parameter }) => {
                StructuralPatch::SetParameter {
                    node: node.clone(),
                    parameter: parameter.clone(),
                    value: value.clone(),
                }
            }
            (Self::RemoveOffender, FindingTarget::Node { name }) => {
                StructuralPatch::RemoveNode { node: name.clone() }
            }
            (Self::RemoveOffender, FindingTarget::Connection { from, to }) => {
                StructuralPatch::RemoveConnection {
                    from: from.clone(),
                    to: to.clone(),
                }
            }
            (Self::SetSetting { value }, FindingTarget::Setting { key }) => {
                StructuralPatch::SetSetting {
                    key: key.clone(),
                    value: value.clone(),
                }
            }
            (Self::AddNode { node }, FindingTarget::Workflow) => StructuralPatch::AddNode {
                node: node.clone(),
                connect_to: entry_node(artifact),
            },
            (Self::RenameWorkflow { name }, FindingTarget::Workflow) => {
                StructuralPatch::RenameWorkflow { name: name.clone() }
            }
            _ => return None,
        };

        Some(SuggestedFix::Patch { patch })
    }
}

/// First node nothing points at, falling back to the first node
fn entry_node(artifact: &WorkflowArtifact) -> Option<String> {
    artifact
        .nodes
        .iter()
        .find(|n| artifact.incoming_count(&n.name) == 0)
        .or_else(|| artifact.nodes.first())
        .map(|n| n.name.clone())
}

/// Knowledge base entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub id: String,
    pub severity: Severity,
    pub predicate: RulePredicate,
    pub message: String,
    #[serde(default, alias = "fix", skip_serializing_if = "Option::is_none")]
    pub suggested_fix: Option<FixTemplate>,
}

impl Rule {
    pub fn new(
        id: impl Into<String>,
        severity: Severity,
        predicate: RulePredicate,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            severity,
            predicate,
            message: message.into(),
            suggested_fix: None,
        }
    }

    pub fn with_fix(mut self, fix: FixTemplate) -> Self {
        self.suggested_fix = Some(fix);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn triggers() -> Vec<String> {
        vec!["webhook".to_string(), "manualTrigger".to_string()]
    }

    fn artifact() -> WorkflowArtifact {
        WorkflowArtifact::new("Lead Intake")
            .with_node(WorkflowNode::new("Hook", "webhook"))
            .with_node(WorkflowNode::new("Mail", "emailSend"))
            .with_connection("Hook", "Mail")
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Critical > Severity::Major);
        assert!(Severity::Major > Severity::Minor);
        assert!(Severity::Critical.penalty() > Severity::Major.penalty() * 2.0);
    }

    #[test]
    fn test_requires_trigger() {
        let predicate = RulePredicate::RequiresTrigger {
            trigger_types: triggers(),
        };
        assert!(predicate.evaluate(&artifact()).is_empty());

        let no_trigger = WorkflowArtifact::new("x").with_node(WorkflowNode::new("Mail", "emailSend"));
        let findings = predicate.evaluate(&no_trigger);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].target, FindingTarget::Workflow);
    }

    #[test]
    fn test_unique_node_names_reports_each_duplicate_once() {
        let wf = WorkflowArtifact::new("x")
            .with_node(WorkflowNode::new("A", "set"))
            .with_node(WorkflowNode::new("A", "set"))
            .with_node(WorkflowNode::new("A", "set"));

        let findings = RulePredicate::UniqueNodeNames.evaluate(&wf);
        assert_eq!(findings.len(), 1);
    }

    #[test]
    fn test_dangling_connections() {
        let wf = artifact().with_connection("Mail", "Nowhere");
        let findings = RulePredicate::NoDanglingConnections.evaluate(&wf);

        assert_eq!(
            findings[0].target,
            FindingTarget::Connection {
                from: "Mail".to_string(),
                to: "Nowhere".to_string()
            }
        );
    }

    #[test]
    fn test_orphan_nodes_skip_triggers() {
        let wf = artifact().with_node(WorkflowNode::new("Lonely", "set"));
        let findings = RulePredicate::NoOrphanNodes {
            trigger_types: triggers(),
        }
        .evaluate(&wf);

        assert_eq!(findings.len(), 1);
        assert_eq!(
            findings[0].target,
            FindingTarget::Node {
                name: "Lonely".to_string()
            }
        );
    }

    #[test]
    fn test_required_parameter() {
        let predicate = RulePredicate::RequiredParameter {
            node_type: "emailSend".to_string(),
            parameter: "to".to_string(),
        };

        let findings = predicate.evaluate(&artifact());
        assert_eq!(findings.len(), 1);

        let fixed = WorkflowArtifact {
            nodes: vec![
                WorkflowNode::new("Hook", "webhook"),
                WorkflowNode::new("Mail", "emailSend").with_parameter("to", json!("a@b.c")),
            ],
            ..artifact()
        };
        assert!(predicate.evaluate(&fixed).is_empty());
    }

    #[test]
    fn test_name_pattern() {
        let predicate = RulePredicate::NamePattern {
            pattern: NamePattern::new("^[A-Z]").unwrap(),
        };

        assert!(predicate.evaluate(&artifact()).is_empty());
        assert_eq!(predicate.evaluate(&WorkflowArtifact::new("lower")).len(), 1);
    }

    #[test]
    fn test_fix_template_support_matrix() {
        let required = RulePredicate::RequiredParameter {
            node_type: "t".to_string(),
            parameter: "p".to_string(),
        };

        assert!(FixTemplate::SetParameter { value: json!(1) }.supports(&required));
        assert!(!FixTemplate::RemoveOffender.supports(&required));
        assert!(FixTemplate::Advice { text: "x".to_string() }.supports(&required));
        assert!(FixTemplate::RemoveOffender.supports(&RulePredicate::NoDanglingConnections));
    }

    #[test]
    fn test_bind_add_node_targets_entry_node() {
        let wf = WorkflowArtifact::new("x")
            .with_node(WorkflowNode::new("Fetch", "httpRequest"))
            .with_node(WorkflowNode::new("Store", "sheets"))
            .with_connection("Fetch", "Store");

        let template = FixTemplate::AddNode {
            node: WorkflowNode::new("Start", "manualTrigger"),
        };

        let fix = template.bind(&FindingTarget::Workflow, &wf).unwrap();
        assert_eq!(
            fix.patch(),
            Some(&StructuralPatch::AddNode {
                node: WorkflowNode::new("Start", "manualTrigger"),
                connect_to: Some("Fetch".to_string()),
            })
        );
    }

    #[test]
    fn test_bind_mismatched_target() {
        let template = FixTemplate::SetSetting { value: json!("UTC") };
        assert!(template.bind(&FindingTarget::Workflow, &artifact()).is_none());
    }

    #[test]
    fn test_advice_is_not_mechanical() {
        let fix = FixTemplate::Advice {
            text: "split into two workflows".to_string(),
        }
        .bind(&FindingTarget::Workflow, &artifact())
        .unwrap();

        assert!(!fix.is_mechanical());
        assert!(fix.patch().is_none());
    }

    #[test]
    fn test_name_pattern_rejects_invalid_regex() {
        let result: Result<NamePattern, _> = serde_json::from_value(json!("(unclosed"));
        assert!(result.is_err());
    }
}
