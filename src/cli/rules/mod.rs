//! Rules command - check that a rule set file loads and summarize it

use std::path::PathBuf;

use clap::Args;

use crate::domain::Severity;
use crate::infrastructure::knowledge::load_rule_set;

#[derive(Args, Debug)]
pub struct RulesArgs {
    /// Rule set file (TOML or JSON)
    pub path: PathBuf,
}

pub fn run(args: RulesArgs) -> anyhow::Result<()> {
    let rules = load_rule_set(&args.path)?;

    println!("rule set {} ({} rules)", rules.version(), rules.len());

    for severity in [Severity::Critical, Severity::Major, Severity::Minor] {
        let matching: Vec<_> = rules.rules().iter().filter(|r| r.severity == severity).collect();

        for rule in matching {
            let fix = if rule.suggested_fix.is_some() { "fix" } else { "-" };
            println!("  {:<8} {:<8} {:<4} {}", rule.id, severity, fix, rule.message);
        }
    }

    Ok(())
}
