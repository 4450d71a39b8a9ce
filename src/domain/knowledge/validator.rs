//! Knowledge validator - scores an artifact against the rule set

use std::cmp::Ordering;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::{FindingTarget, Rule, RuleSet, Severity, SuggestedFix};
use crate::domain::artifact::WorkflowArtifact;

/// A single rule failure against a specific part of the artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    pub rule_id: String,
    pub severity: Severity,
    pub message: String,
    pub target: FindingTarget,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_fix: Option<SuggestedFix>,
}

impl Violation {
    /// Severity descending, then rule id ascending, then target
    pub fn report_order(&self, other: &Self) -> Ordering {
        other
            .severity
            .cmp(&self.severity)
            .then_with(|| self.rule_id.cmp(&other.rule_id))
            .then_with(|| self.target.cmp(&other.target))
    }

    pub fn is_mechanically_fixable(&self) -> bool {
        self.suggested_fix
            .as_ref()
            .is_some_and(SuggestedFix::is_mechanical)
    }
}

/// Outcome of validating one artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub score: f64,
    pub violations: Vec<Violation>,
    pub rule_set_version: String,
}

impl ValidationResult {
    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn count_by_severity(&self, severity: Severity) -> usize {
        self.violations
            .iter()
            .filter(|v| v.severity == severity)
            .count()
    }
}

/// Read-only evaluator over a shared rule set
#[derive(Debug, Clone)]
pub struct KnowledgeValidator {
    rules: Arc<RuleSet>,
}

impl KnowledgeValidator {
    pub fn new(rules: Arc<RuleSet>) -> Self {
        Self { rules }
    }

    pub fn rule_set(&self) -> &RuleSet {
        &self.rules
    }

    /// Evaluate every rule; never mutates the artifact
    pub fn validate(&self, artifact: &WorkflowArtifact) -> ValidationResult {
        let mut violations: Vec<Violation> = self
            .rules
            .rules()
            .iter()
            .flat_map(|rule| Self::evaluate_rule(rule, artifact))
            .collect();

        violations.sort_by(Violation::report_order);

        ValidationResult {
            score: score(&violations),
            violations,
            rule_set_version: self.rules.version().to_string(),
        }
    }

    /// Violations of a single rule, used to re-check a fix before applying it
    pub fn violations_for_rule(&self, rule_id: &str, artifact: &WorkflowArtifact) -> Vec<Violation> {
        self.rules
            .get(rule_id)
            .map(|rule| Self::evaluate_rule(rule, artifact))
            .unwrap_or_default()
    }

    fn evaluate_rule(rule: &Rule, artifact: &WorkflowArtifact) -> Vec<Violation> {
        rule.predicate
            .evaluate(artifact)
            .into_iter()
            .map(|finding| Violation {
                rule_id: rule.id.clone(),
                severity: rule.severity,
                message: format!("{}: {}", rule.message, finding.detail),
                suggested_fix: rule
                    .suggested_fix
                    .as_ref()
                    .and_then(|fix| fix.bind(&finding.target, artifact)),
                target: finding.target,
            })
            .collect()
    }
}

/// Weighted deduction from 1.0, floored at 0.0
fn score(violations: &[Violation]) -> f64 {
    let penalty: f64 = violations.iter().map(|v| v.severity.penalty()).sum();
    (1.0 - penalty).max(0.0)
}
