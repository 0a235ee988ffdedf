//! The fetch and install transitions of the install flow.
//!
//! ```text
//! ResolvedRelease --[fetch_and_verify()]--> VerifiedRelease --[install()]--> InstalledRelease
//! ```
//!
//! A [`VerifiedRelease`] can only be obtained by hashing the downloaded
//! bytes, so nothing reaches the bin directory without a checksum match.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use tempfile::TempDir;
use tracing::{debug, info, warn};

use crate::config::InstallerConfig;
use crate::error::PipelineError;
use crate::formula::Formula;
use crate::install::{self, InstallError};
use crate::io::download::{DownloadError, DownloadRequest, VerifiedArtifact, asset_name};
use crate::reporter::Reporter;
use crate::resolve::{ResolvedRelease, resolve};
use tapbin_schema::{PackageName, Platform, Sha256Digest, Version};

/// Shared state for one install run.
#[derive(Clone)]
pub struct Context {
    /// HTTP client used for downloads.
    pub client: Client,
    /// Installer configuration.
    pub config: Arc<InstallerConfig>,
    /// Progress sink.
    pub reporter: Arc<dyn Reporter>,
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Context {
    /// Build a context with a client configured from `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS backend cannot be initialised.
    pub fn new(config: InstallerConfig, reporter: Arc<dyn Reporter>) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .connect_timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            config: Arc::new(config),
            reporter,
        })
    }
}

/// State 2: the artifact is on disk and its checksum matches.
///
/// # Transitions
///
/// - [`install()`](Self::install) -> [`InstalledRelease`]
#[derive(Debug)]
pub struct VerifiedRelease<'f> {
    /// Where the artifact came from.
    pub resolved: ResolvedRelease<'f>,
    /// The verified file.
    pub artifact: VerifiedArtifact,
    /// Staging directory holding the artifact (removed on drop).
    pub staging: TempDir,
}

/// State 3: the binary is in place.
#[derive(Debug, Clone)]
pub struct InstalledRelease {
    /// Installed package.
    pub name: PackageName,
    /// Installed version.
    pub version: Version,
    /// Final path of the binary.
    pub path: PathBuf,
    /// Digest of the artifact the binary came from.
    pub sha256: Sha256Digest,
    /// Size of the installed binary in bytes.
    pub size: u64,
}

impl<'f> ResolvedRelease<'f> {
    /// Download the entry's artifact into a fresh staging directory and
    /// verify it.
    ///
    /// # Errors
    ///
    /// [`PipelineError::ChecksumMismatch`] if the bytes do not match the
    /// recorded digest, [`PipelineError::Download`] for transport and
    /// filesystem failures.
    pub async fn fetch_and_verify(self, ctx: &Context) -> Result<VerifiedRelease<'f>, PipelineError> {
        let name = self.formula.name();
        let version = self.formula.version();

        std::fs::create_dir_all(&ctx.config.tmp_dir).map_err(DownloadError::from)?;
        let staging = tempfile::Builder::new()
            .prefix("tapbin-")
            .tempdir_in(&ctx.config.tmp_dir)
            .map_err(DownloadError::from)?;

        let artifact = DownloadRequest {
            client: &ctx.client,
            pkg_name: name,
            version,
            entry: self.entry,
            dest_dir: staging.path(),
            retry: ctx.config.retry,
            reporter: &*ctx.reporter,
        }
        .execute()
        .await?;

        ctx.reporter.verified(name, version, &artifact.sha256);
        Ok(VerifiedRelease {
            resolved: self,
            artifact,
            staging,
        })
    }
}

impl VerifiedRelease<'_> {
    /// Unpack the artifact and place the binary into the configured bin
    /// directory, replacing any previous copy.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Install`] if extraction or placement fails.
    pub async fn install(self, ctx: &Context) -> Result<InstalledRelease, PipelineError> {
        let formula = self.resolved.formula;
        let name = formula.name();
        let version = formula.version();
        let bin_name = formula.bin_name().to_string();

        ctx.reporter.installing(name, version);

        let artifact = self.artifact.clone();
        let bin_dir = ctx.config.bin_dir.clone();
        let staging = self.staging.path().to_path_buf();
        let task_bin = bin_name.clone();
        let placed = tokio::task::spawn_blocking(move || {
            install::install_binary(&artifact, &task_bin, &bin_dir, &staging)
        })
        .await
        .map_err(|e| InstallError::Io(std::io::Error::other(e)))?;

        let placed = match placed {
            Ok(placed) => placed,
            Err(e) => {
                ctx.reporter.failed(name, version, &e.to_string());
                return Err(e.into());
            }
        };

        warn_if_shadowed(ctx, &bin_name, &placed.path);

        info!(
            package = %name,
            %version,
            path = %placed.path.display(),
            "installed"
        );
        ctx.reporter.done(
            name,
            version,
            &placed.path.display().to_string(),
            Some(placed.size),
        );

        Ok(InstalledRelease {
            name: name.clone(),
            version: version.clone(),
            path: placed.path,
            sha256: self.artifact.sha256,
            size: placed.size,
        })
    }
}

/// Warn when running `bin_name` from PATH would not pick up `installed`.
fn warn_if_shadowed(ctx: &Context, bin_name: &str, installed: &std::path::Path) {
    match which::which(bin_name) {
        Ok(found) => {
            let same = match (found.canonicalize(), installed.canonicalize()) {
                (Ok(a), Ok(b)) => a == b,
                _ => found == installed,
            };
            if !same {
                warn!(found = %found.display(), installed = %installed.display(), "binary shadowed on PATH");
                ctx.reporter.warning(&format!(
                    "{bin_name} on PATH resolves to {}, not {}",
                    found.display(),
                    installed.display()
                ));
            }
        }
        Err(_) => {
            debug!(bin_name, "binary not found on PATH");
            ctx.reporter.warning(&format!(
                "{} is not on PATH; add it to run {bin_name}",
                ctx.config.bin_dir.display()
            ));
        }
    }
}

/// Resolve, fetch, verify and install `formula` for `platform`.
///
/// # Errors
///
/// Propagates the first [`PipelineError`] of any step; later steps do not run.
pub async fn run(
    ctx: &Context,
    formula: &Formula,
    platform: Platform,
) -> Result<InstalledRelease, PipelineError> {
    ctx.reporter.section("Resolving");
    let resolved = resolve(formula, platform)?;
    ctx.reporter.info(&format!(
        "{} {} for {platform}: {}",
        formula.name(),
        formula.version(),
        asset_name(&resolved.entry.url).unwrap_or_else(|| resolved.entry.url.clone())
    ));

    ctx.reporter.section("Downloading");
    let verified = resolved.fetch_and_verify(ctx).await?;

    ctx.reporter.section("Installing");
    verified.install(ctx).await
}
