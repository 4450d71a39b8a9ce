use clap::Parser;
use pmp_workflow_builder::cli::{self, Cli, Command};
use pmp_workflow_builder::infrastructure::logging::init_logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = cli.load_config()?;
    init_logging(&config.logging);

    match cli.command {
        Command::Serve => cli::serve::run(config).await,
        Command::Run(args) => cli::run::run(config, args).await,
        Command::Validate(args) => cli::validate::run(config, args),
        Command::Rules(args) => cli::rules::run(args),
    }
}
