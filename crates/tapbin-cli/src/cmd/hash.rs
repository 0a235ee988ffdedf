//! Hash command

use anyhow::{Context, Result};
use std::path::PathBuf;

use tapbin_schema::Sha256Digest;

/// Print the SHA256 of each file, in the form formulas expect.
pub fn hash(files: &[PathBuf]) -> Result<()> {
    for file in files {
        let digest = Sha256Digest::compute_file(file)
            .with_context(|| format!("Failed to read {}", file.display()))?;
        println!("{digest} {}", file.display());
    }
    Ok(())
}
