//! Install command

use anyhow::{Context as _, Result};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use crate::ui::ConsoleReporter;
use crate::{FormulaArgs, PlatformArgs};
use tapbin_core::{Context, InstallerConfig, Reporter, RetryPolicy, resolve, run};

/// Options for the install command beyond formula and platform selection.
#[derive(Debug, Default)]
pub struct InstallOptions {
    /// Override for the bin directory.
    pub bin_dir: Option<PathBuf>,
    /// Override for the number of download attempts.
    pub retries: Option<u32>,
    /// Stop after resolving and print the plan.
    pub dry_run: bool,
}

/// Run the full pipeline for the selected platform.
pub async fn install(
    formula: &FormulaArgs,
    platform: &PlatformArgs,
    opts: InstallOptions,
    reporter: &Arc<ConsoleReporter>,
) -> Result<()> {
    let formula = formula.load()?;
    let platform = platform.platform();

    let mut config = InstallerConfig::from_env()
        .context("Could not determine home directory; set TAPBIN_HOME")?;
    if let Some(bin_dir) = opts.bin_dir {
        config = config.with_bin_dir(bin_dir);
    }
    if let Some(attempts) = opts.retries {
        config = config.with_retry(RetryPolicy {
            max_attempts: attempts,
            ..RetryPolicy::default()
        });
    }

    tracing::debug!(
        "Installing {} {} for {platform} into {}",
        formula.name(),
        formula.version(),
        config.bin_dir.display()
    );

    if opts.dry_run {
        let resolved = resolve(&formula, platform)?;
        reporter.info(&format!(
            "Would install {} {} for {platform}",
            formula.name(),
            formula.version()
        ));
        println!("  from   {}", resolved.entry.url);
        println!("  sha256 {}", resolved.entry.sha256);
        println!(
            "  to     {}",
            config.bin_dir.join(formula.bin_name()).display()
        );
        return Ok(());
    }

    let start = Instant::now();
    let sink: Arc<dyn Reporter> = reporter.clone();
    let ctx = Context::new(config, sink).context("Failed to create HTTP client")?;
    let installed = run(&ctx, &formula, platform).await?;

    reporter.success(&format!(
        "Installed {} {} in {:.1}s",
        installed.name,
        installed.version,
        start.elapsed().as_secs_f64()
    ));
    Ok(())
}
