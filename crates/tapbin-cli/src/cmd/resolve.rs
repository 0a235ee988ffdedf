//! Resolve command

use anyhow::Result;

use crate::{FormulaArgs, PlatformArgs};
use tapbin_core::io::download::asset_name;
use tapbin_core::resolve;
use tapbin_schema::ArtifactFormat;

/// Print the release entry the platform selects.
pub fn resolve_cmd(formula: &FormulaArgs, platform: &PlatformArgs) -> Result<()> {
    let formula = formula.load()?;
    let platform = platform.platform();
    let resolved = resolve(&formula, platform)?;
    let entry = resolved.entry;

    let lw = 10;
    println!("{:<lw$}{} {}", "package", formula.name(), formula.version());
    println!("{:<lw$}{platform}", "platform");
    println!("{:<lw$}{}", "entry", entry.selector());
    println!("{:<lw$}{}", "url", entry.url);
    println!("{:<lw$}{}", "sha256", entry.sha256);
    let asset = asset_name(&entry.url).unwrap_or_default();
    let format = ArtifactFormat::detect(&asset)
        .map_or_else(|| "unsupported".to_string(), |f| f.to_string());
    println!("{:<lw$}{asset}", "asset");
    println!("{:<lw$}{format}", "format");
    Ok(())
}
