//! tapbin CLI entry point

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use tapbin_cli::cmd;
use tapbin_cli::cmd::install::InstallOptions;
use tapbin_cli::ui::ConsoleReporter;
use tapbin_cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    tracing::debug!(command = ?cli.command, dry_run = cli.dry_run, "dispatching");
    let dry_run = cli.dry_run;
    let reporter = Arc::new(ConsoleReporter::new(cli.quiet));

    match cli.command {
        Commands::Install {
            formula,
            platform,
            bin_dir,
            retries,
        } => {
            let opts = InstallOptions {
                bin_dir,
                retries,
                dry_run,
            };
            cmd::install::install(&formula, &platform, opts, &reporter).await
        }
        Commands::Resolve { formula, platform } => cmd::resolve::resolve_cmd(&formula, &platform),
        Commands::Info { formula } => cmd::info::info(&formula),
        Commands::Check { path } => cmd::check::check(&path, &reporter),
        Commands::Import { path, output } => {
            cmd::import::import(&path, output.as_deref(), dry_run, &reporter)
        }
        Commands::Hash { files } => cmd::hash::hash(&files),
        Commands::Completions { shell } => {
            cmd::completions::completions(shell);
            Ok(())
        }
    }
}
