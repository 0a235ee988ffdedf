//! Info command

use anyhow::Result;
use crossterm::style::Stylize;

use crate::FormulaArgs;
use tapbin_schema::Platform;

/// Show formula metadata and its release table.
pub fn info(formula: &FormulaArgs) -> Result<()> {
    let formula = formula.load()?;
    let package = formula.package();
    let current = Platform::current();

    let lw = 12;

    println!();
    println!(
        "  {} {}",
        package.name.as_str().white().bold(),
        package.version.as_str().dark_grey()
    );
    if !package.desc.is_empty() {
        println!("  {}", package.desc);
    }
    println!();

    if !package.homepage.is_empty() {
        println!("  {:<lw$}{}", "homepage", package.homepage);
    }
    if !package.license.is_empty() {
        println!("  {:<lw$}{}", "license", package.license);
    }
    println!("  {:<lw$}{}", "binary", formula.bin_name());
    println!();

    for entry in formula.releases() {
        let marker = if entry.matches(&current) { "*" } else { " " };
        println!("  {marker} {}", entry.selector().cyan());
        println!("      {}", entry.url);
        println!("      {}", entry.sha256.as_str().dark_grey());
    }

    Ok(())
}
