//! Knowledge base domain
//!
//! A versioned, immutable set of rules is evaluated against synthesized
//! workflow artifacts. The validator scores an artifact and lists violations
//! with bound fixes; the corrector applies the mechanical ones.

mod corrector;
mod error;
mod rule;
mod rule_set;
mod validator;

pub use corrector::{AutoCorrector, CorrectionOutcome, CorrectionReport, FixOutcome};
pub use error::KnowledgeError;
pub use rule::{
    Finding, FindingTarget, FixTemplate, NamePattern, Rule, RulePredicate, Severity, SuggestedFix,
};
pub use rule_set::{RuleSet, RuleSetFormat};
pub use validator::{KnowledgeValidator, ValidationResult, Violation};
