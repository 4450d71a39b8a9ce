//! Run command - one request through the pipeline, inline

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;

use crate::config::AppConfig;
use crate::domain::{Priority, RawRequest, SnapshotOutcome, TerminalSnapshot};

#[derive(Args, Debug)]
pub struct RunArgs {
    /// The automation brief
    #[arg(long, conflicts_with = "brief_file", required_unless_present = "brief_file")]
    pub brief: Option<String>,

    /// Read the brief from a file
    #[arg(long)]
    pub brief_file: Option<PathBuf>,

    /// Contact reference recorded with the request
    #[arg(long)]
    pub contact: String,

    /// Skip the response cache
    #[arg(long)]
    pub high_priority: bool,

    /// Exit non-zero unless the artifact validates cleanly
    #[arg(long)]
    pub strict: bool,
}

impl RunArgs {
    fn raw_request(&self) -> anyhow::Result<RawRequest> {
        let brief = match (&self.brief, &self.brief_file) {
            (Some(brief), _) => brief.clone(),
            (None, Some(path)) => std::fs::read_to_string(path)
                .with_context(|| format!("failed to read brief from {}", path.display()))?,
            (None, None) => anyhow::bail!("either --brief or --brief-file is required"),
        };

        let priority = if self.high_priority {
            Priority::High
        } else {
            Priority::Standard
        };

        Ok(RawRequest::new(brief, self.contact.clone()).with_priority(priority))
    }
}

pub async fn run(config: AppConfig, args: RunArgs) -> anyhow::Result<()> {
    let request = args.raw_request()?;
    let runtime = crate::build_runtime(&config).await?;

    let envelope = runtime.pipeline.run(request).await;
    let snapshot = TerminalSnapshot::from(&envelope);

    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    runtime.shutdown().await;

    match snapshot.outcome {
        SnapshotOutcome::Validated => Ok(()),
        SnapshotOutcome::Halted => anyhow::bail!("pipeline halted before producing an artifact"),
        SnapshotOutcome::Unresolved if args.strict => {
            anyhow::bail!("artifact still has rule violations")
        }
        SnapshotOutcome::Unresolved => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn args(brief: Option<&str>, brief_file: Option<PathBuf>) -> RunArgs {
        RunArgs {
            brief: brief.map(str::to_string),
            brief_file,
            contact: "ops@example.com".to_string(),
            high_priority: true,
            strict: false,
        }
    }

    #[test]
    fn test_brief_from_argument() {
        let request = args(Some("Send the weekly report"), None).raw_request().unwrap();

        assert_eq!(request.brief, "Send the weekly report");
        assert_eq!(request.priority, Priority::High);
    }

    #[test]
    fn test_brief_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "Archive invoices nightly").unwrap();

        let request = args(None, Some(file.path().to_path_buf())).raw_request().unwrap();
        assert_eq!(request.brief, "Archive invoices nightly");
    }

    #[test]
    fn test_missing_brief_file_is_an_error() {
        let result = args(None, Some(PathBuf::from("/nonexistent/brief.txt"))).raw_request();
        assert!(result.is_err());
    }
}
