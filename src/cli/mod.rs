//! CLI module for the workflow builder
//!
//! Subcommands:
//! - `serve`: HTTP API
//! - `run`: one brief through the pipeline, snapshot printed as JSON
//! - `validate`: check an artifact file against the rule set
//! - `rules`: check that a rule set file loads

pub mod rules;
pub mod run;
pub mod serve;
pub mod validate;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::AppConfig;

/// Workflow Builder - natural-language briefs in, validated workflows out
#[derive(Parser)]
#[command(name = "pmp-workflow-builder")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Extra configuration file layered over config/default and config/local
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the HTTP API
    Serve,

    /// Run one request to completion
    Run(run::RunArgs),

    /// Validate a workflow artifact file
    Validate(validate::ValidateArgs),

    /// Check a rule set file
    Rules(rules::RulesArgs),
}

impl Cli {
    pub fn load_config(&self) -> anyhow::Result<AppConfig> {
        Ok(AppConfig::load_from(self.config.as_deref())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_run_command() {
        let cli = Cli::parse_from([
            "pmp-workflow-builder",
            "run",
            "--brief",
            "Send a digest every morning",
            "--contact",
            "ops@example.com",
            "--high-priority",
        ]);

        match cli.command {
            Command::Run(args) => {
                assert_eq!(args.brief.as_deref(), Some("Send a digest every morning"));
                assert!(args.high_priority);
            }
            _ => panic!("expected run"),
        }
    }
}
