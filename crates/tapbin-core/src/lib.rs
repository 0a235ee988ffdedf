//! Core library for tapbin.
//!
//! The install flow is a strict three-step typestate:
//!
//! ```text
//! Formula --[resolve()]--> ResolvedRelease --[fetch_and_verify()]--> VerifiedRelease --[install()]--> InstalledRelease
//! ```
//!
//! Each step blocks until complete and any failure aborts the whole run;
//! see [`PipelineError`] for the taxonomy.

pub mod config;
pub mod error;
pub mod formula;
pub mod install;
pub mod io;
pub mod paths;
pub mod pipeline;
pub mod reporter;
pub mod resolve;

pub use config::{InstallerConfig, RetryPolicy};
pub use error::PipelineError;
pub use formula::{Formula, FormulaError, InstallSpec, PackageInfo};
pub use pipeline::{Context, InstalledRelease, VerifiedRelease, run};
pub use reporter::{NullReporter, Reporter};
pub use resolve::{ResolvedRelease, resolve};

/// User Agent string for core operations
pub const USER_AGENT: &str = concat!("tapbin/", env!("CARGO_PKG_VERSION"));
