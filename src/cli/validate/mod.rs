//! Validate command - score an artifact file against the rule set

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Args;
use serde_json::json;

use crate::config::AppConfig;
use crate::domain::{AutoCorrector, KnowledgeValidator, WorkflowArtifact};

#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Workflow artifact as JSON
    pub artifact: PathBuf,

    /// Apply mechanical fixes and print the corrected artifact too
    #[arg(long)]
    pub correct: bool,
}

pub fn run(config: AppConfig, args: ValidateArgs) -> anyhow::Result<()> {
    let rules = crate::load_rules(&config)?;
    let validator = KnowledgeValidator::new(rules);
    let artifact = read_artifact(&args.artifact)?;

    let result = validator.validate(&artifact);

    let output = if args.correct {
        let report = AutoCorrector::new(validator.clone()).correct(&artifact, &result.violations);
        let revalidated = validator.validate(&report.artifact);

        json!({
            "result": result,
            "corrected": {
                "applied_count": report.applied_count,
                "outcomes": report.outcomes,
                "artifact": report.artifact,
                "result": revalidated,
            },
        })
    } else {
        json!({ "result": result })
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn read_artifact(path: &Path) -> anyhow::Result<WorkflowArtifact> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read artifact {}", path.display()))?;

    serde_json::from_str(&content)
        .with_context(|| format!("{} is not a workflow artifact", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_read_artifact() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"name": "Lead Sync", "nodes": [{{"name": "Start", "type": "manualTrigger"}}]}}"#
        )
        .unwrap();

        let artifact = read_artifact(file.path()).unwrap();
        assert_eq!(artifact.name, "Lead Sync");
        assert_eq!(artifact.nodes.len(), 1);
    }

    #[test]
    fn test_read_artifact_rejects_other_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"workflow": true}}"#).unwrap();

        assert!(read_artifact(file.path()).is_err());
    }
}
