//! tapbin - install one prebuilt release binary from a formula
#![allow(missing_docs)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]
//!
//! # Overview
//!
//! A formula lists one download per platform together with its SHA-256.
//! tapbin picks the entry for the running machine, downloads and verifies
//! it, then drops the binary into a bin directory. The graphjin formula is
//! compiled in; `--formula` points at any other `.rb` or `.toml` file.
//!
//! # Directory Layout
//!
//! ```text
//! ~/.tapbin/
//! ├── bin/   # Installed binaries
//! └── tmp/   # Per-run staging (emptied after every run)
//! ```

pub mod cmd;
pub mod ui;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use tapbin_core::Formula;
use tapbin_schema::{BitWidth, CpuArch, Os, Platform};

#[derive(Debug, Parser)]
#[command(name = "tapbin")]
#[command(
    author,
    version = env!("TAPBIN_VERSION"),
    about = "tapbin - install a prebuilt release binary from a Homebrew-style formula"
)]
pub struct Cli {
    /// Show what would happen without making changes
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Download, verify and install the binary for this platform
    Install {
        #[command(flatten)]
        formula: FormulaArgs,
        #[command(flatten)]
        platform: PlatformArgs,
        /// Directory to place the binary in
        #[arg(long, env = "TAPBIN_BIN_DIR")]
        bin_dir: Option<PathBuf>,
        /// Total download attempts for transient failures
        #[arg(long, env = "TAPBIN_RETRIES")]
        retries: Option<u32>,
    },
    /// Show which release entry a platform selects
    Resolve {
        #[command(flatten)]
        formula: FormulaArgs,
        #[command(flatten)]
        platform: PlatformArgs,
    },
    /// Show formula metadata and every release entry
    Info {
        #[command(flatten)]
        formula: FormulaArgs,
    },
    /// Validate a formula file
    Check {
        /// Formula file (.rb or .toml)
        path: PathBuf,
    },
    /// Convert a Homebrew formula to TOML
    Import {
        /// Homebrew formula (.rb)
        path: PathBuf,
        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Compute SHA256 hash of a file (for formula authoring)
    #[command(hide = true)]
    Hash {
        /// Files to hash
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
}

/// Where the formula comes from.
#[derive(Debug, Clone, Args)]
pub struct FormulaArgs {
    /// Formula file to use instead of the built-in one (.rb or .toml)
    #[arg(long, env = "TAPBIN_FORMULA")]
    pub formula: Option<PathBuf>,
}

impl FormulaArgs {
    /// Load the selected formula.
    pub fn load(&self) -> Result<Formula> {
        match &self.formula {
            Some(path) => Formula::from_file(path)
                .with_context(|| format!("Failed to load formula {}", path.display())),
            None => Ok(Formula::builtin()
                .context("Built-in formula is invalid")?
                .clone()),
        }
    }
}

/// Overrides for the detected platform.
#[derive(Debug, Clone, Args)]
pub struct PlatformArgs {
    /// Operating system (macos, linux, windows)
    #[arg(long)]
    pub os: Option<Os>,
    /// CPU architecture (intel, arm)
    #[arg(long)]
    pub arch: Option<CpuArch>,
    /// Pointer width (32, 64)
    #[arg(long)]
    pub bits: Option<BitWidth>,
}

impl PlatformArgs {
    /// The running platform with any overrides applied.
    pub fn platform(&self) -> Platform {
        Platform::current().with_overrides(self.os, self.arch, self.bits)
    }
}
