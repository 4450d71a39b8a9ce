//! Auto-corrector - applies mechanical fixes one at a time

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{FindingTarget, KnowledgeValidator, Violation};
use crate::domain::artifact::WorkflowArtifact;

/// What happened to a single eligible fix
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CorrectionOutcome {
    Applied,
    /// A structural precondition failed; never retried
    Skipped { reason: String },
    /// An earlier fix already made the violation go away
    AlreadyResolved,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixOutcome {
    pub rule_id: String,
    pub target: FindingTarget,
    #[serde(flatten)]
    pub outcome: CorrectionOutcome,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrectionReport {
    pub artifact: WorkflowArtifact,
    pub applied_count: u32,
    pub outcomes: Vec<FixOutcome>,
}

impl CorrectionReport {
    pub fn skipped(&self) -> impl Iterator<Item = &FixOutcome> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.outcome, CorrectionOutcome::Skipped { .. }))
    }
}

/// Applies structural patches carried by violations
#[derive(Debug, Clone)]
pub struct AutoCorrector {
    validator: KnowledgeValidator,
}

impl AutoCorrector {
    pub fn new(validator: KnowledgeValidator) -> Self {
        Self { validator }
    }

    /// Apply every mechanical fix in severity-descending order.
    ///
    /// Each fix is checked against the current state of the artifact before
    /// it is applied, so two fixes never conflict silently.
    pub fn correct(&self, artifact: &WorkflowArtifact, violations: &[Violation]) -> CorrectionReport {
        let mut eligible: Vec<&Violation> = violations
            .iter()
            .filter(|v| v.is_mechanically_fixable())
            .collect();
        eligible.sort_by(|a, b| a.report_order(b));

        let mut current = artifact.clone();
        let mut applied_count = 0;
        let mut outcomes = Vec::with_capacity(eligible.len());

        for violation in eligible {
            let Some(patch) = violation.suggested_fix.as_ref().and_then(|f| f.patch()) else {
                continue;
            };

            let outcome = match patch.apply(&current) {
                Err(e) => CorrectionOutcome::Skipped {
                    reason: e.to_string(),
                },
                Ok(_) if !self.still_violated(violation, &current) => {
                    CorrectionOutcome::AlreadyResolved
                }
                Ok(patched) => {
                    current = patched;
                    applied_count += 1;
                    CorrectionOutcome::Applied
                }
            };

            debug!(
                rule_id = %violation.rule_id,
                outcome = ?outcome,
                "Processed suggested fix"
            );

            outcomes.push(FixOutcome {
                rule_id: violation.rule_id.clone(),
                target: violation.target.clone(),
                outcome,
            });
        }

        CorrectionReport {
            artifact: current,
            applied_count,
            outcomes,
        }
    }

    fn still_violated(&self, violation: &Violation, artifact: &WorkflowArtifact) -> bool {
        self.validator
            .violations_for_rule(&violation.rule_id, artifact)
            .iter()
            .any(|v| v.target == violation.target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::artifact::WorkflowNode;
    use crate::domain::knowledge::{FixTemplate, Rule, RulePredicate, RuleSet, Severity};
    use serde_json::json;
    use std::sync::Arc;

    fn corrector(rules: Vec<Rule>) -> (KnowledgeValidator, AutoCorrector) {
        let validator = KnowledgeValidator::new(Arc::new(RuleSet::new("t", rules).unwrap()));
        (validator.clone(), AutoCorrector::new(validator))
    }

    fn recipient_rule() -> Rule {
        Rule::new(
            "WF-020",
            Severity::Major,
            RulePredicate::RequiredParameter {
                node_type: "emailSend".to_string(),
                parameter: "to".to_string(),
            },
            "Email nodes need a recipient",
        )
        .with_fix(FixTemplate::SetParameter {
            value: json!("={{$json.email}}"),
        })
    }

    fn forbidden_rule() -> Rule {
        Rule::new(
            "WF-021",
            Severity::Critical,
            RulePredicate::ForbiddenNodeType {
                node_type: "emailSend".to_string(),
            },
            "Email is disabled",
        )
        .with_fix(FixTemplate::RemoveOffender)
    }

    fn artifact() -> WorkflowArtifact {
        WorkflowArtifact::new("Lead Intake")
            .with_node(WorkflowNode::new("Hook", "webhook"))
            .with_node(WorkflowNode::new("Mail", "emailSend"))
            .with_connection("Hook", "Mail")
    }

    #[test]
    fn test_single_major_fix_restores_full_score() {
        let (validator, corrector) = corrector(vec![recipient_rule()]);
        let before = validator.validate(&artifact());
        assert!((before.score - 0.8).abs() < 1e-9);

        let report = corrector.correct(&artifact(), &before.violations);
        assert_eq!(report.applied_count, 1);
        assert_eq!(report.outcomes[0].outcome, CorrectionOutcome::Applied);

        let after = validator.validate(&report.artifact);
        assert_eq!(after.score, 1.0);
    }

    #[test]
    fn test_fix_on_removed_node_is_skipped() {
        let (validator, corrector) = corrector(vec![recipient_rule(), forbidden_rule()]);
        let violations = validator.validate(&artifact()).violations;

        let report = corrector.correct(&artifact(), &violations);

        assert_eq!(report.applied_count, 1);
        assert_eq!(report.outcomes[0].rule_id, "WF-021");
        assert_eq!(report.outcomes[0].outcome, CorrectionOutcome::Applied);
        assert!(matches!(
            report.outcomes[1].outcome,
            CorrectionOutcome::Skipped { .. }
        ));
        assert_eq!(report.skipped().count(), 1);
        assert!(!report.artifact.has_node("Mail"));
    }

    #[test]
    fn test_advice_is_not_applied() {
        let rule = Rule::new(
            "WF-050",
            Severity::Minor,
            RulePredicate::MaxNodes { max: 1 },
            "Keep it small",
        )
        .with_fix(FixTemplate::Advice {
            text: "split the workflow".to_string(),
        });
        let (validator, corrector) = corrector(vec![rule]);
        let violations = validator.validate(&artifact()).violations;

        let report = corrector.correct(&artifact(), &violations);

        assert_eq!(report.applied_count, 0);
        assert!(report.outcomes.is_empty());
        assert_eq!(report.artifact, artifact());
    }

    #[test]
    fn test_duplicate_fix_resolved_by_earlier_one() {
        let (validator, corrector) = corrector(vec![recipient_rule()]);
        let mut violations = validator.validate(&artifact()).violations;
        violations.push(violations[0].clone());

        let report = corrector.correct(&artifact(), &violations);

        assert_eq!(report.applied_count, 1);
        assert_eq!(report.outcomes[1].outcome, CorrectionOutcome::AlreadyResolved);
    }

    #[test]
    fn test_input_artifact_untouched() {
        let (validator, corrector) = corrector(vec![recipient_rule()]);
        let original = artifact();
        let violations = validator.validate(&original).violations;

        let report = corrector.correct(&original, &violations);

        assert_ne!(report.artifact, original);
        assert_eq!(original, artifact());
    }
}
