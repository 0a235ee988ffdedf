//! Check command

use anyhow::{Context, Result};
use std::path::Path;

use crate::ui::ConsoleReporter;
use tapbin_core::{Formula, Reporter};

/// Load and validate a formula file.
pub fn check(path: &Path, output: &ConsoleReporter) -> Result<()> {
    let formula = Formula::from_file(path)
        .with_context(|| format!("Invalid formula {}", path.display()))?;

    output.success(&format!("{} is valid", path.display()));
    println!("  Name: {}", formula.name());
    println!("  Version: {}", formula.version());
    println!("  Binary: {}", formula.bin_name());
    println!("  Releases: {}", formula.releases().len());

    if !formula.version().is_semver() {
        output.warning(&format!(
            "Version '{}' is not semantic versioning",
            formula.version()
        ));
    }

    Ok(())
}
