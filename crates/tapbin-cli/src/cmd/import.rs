//! Import command

use anyhow::{Context, Result};
use std::path::Path;

use crate::ui::ConsoleReporter;
use tapbin_core::Formula;

/// Render a formula (usually a Homebrew `.rb`) as TOML.
pub fn import(path: &Path, out: Option<&Path>, dry_run: bool, output: &ConsoleReporter) -> Result<()> {
    let formula = Formula::from_file(path)
        .with_context(|| format!("Failed to import {}", path.display()))?;
    let rendered = formula.to_toml()?;

    match out {
        Some(dest) if !dry_run => {
            std::fs::write(dest, &rendered)
                .with_context(|| format!("Failed to write {}", dest.display()))?;
            output.success(&format!(
                "Wrote {} {} to {}",
                formula.name(),
                formula.version(),
                dest.display()
            ));
        }
        _ => print!("{rendered}"),
    }

    Ok(())
}
