//! Placing a verified artifact's binary into the bin directory.
//!
//! The binary is staged as a temporary file next to its destination and
//! renamed over it, so a failed install never leaves a half-written file
//! and a previous install stays usable until the new one is complete.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::debug;

use tapbin_schema::ArtifactFormat;

use crate::io::download::VerifiedArtifact;
use crate::io::extract::{self, ExtractError};

/// Failures while unpacking or placing the binary.
#[derive(Error, Debug)]
pub enum InstallError {
    /// The bin directory cannot be created or written to.
    #[error("Cannot write to {}: {source}", path.display())]
    NotWritable {
        /// Directory or file that could not be written.
        path: PathBuf,
        /// Underlying error.
        source: io::Error,
    },

    /// The artifact is packed in a format tapbin cannot unpack.
    #[error("Unsupported archive format: {asset}")]
    UnsupportedFormat {
        /// Asset file name from the URL.
        asset: String,
    },

    /// The artifact could not be unpacked.
    #[error("Extraction failed: {0}")]
    Extract(#[from] ExtractError),

    /// The artifact does not contain the expected executable.
    #[error("Binary '{name}' not found in artifact")]
    MissingBinary {
        /// File name that was searched for.
        name: String,
    },

    /// Any other filesystem failure.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// A binary that has been placed in its final location.
#[derive(Debug, Clone)]
pub struct InstalledBinary {
    /// Final path of the executable.
    pub path: PathBuf,
    /// Size in bytes.
    pub size: u64,
}

/// Unpack `artifact` into `staging` and place `bin_name` into `bin_dir`.
///
/// Blocking; call from `spawn_blocking` inside async code.
///
/// # Errors
///
/// [`InstallError::UnsupportedFormat`] if the asset name carries an archive
/// suffix that cannot be unpacked, [`InstallError::NotWritable`] if
/// `bin_dir` cannot be created or the binary cannot be written there,
/// [`InstallError::MissingBinary`] if the artifact holds no file called
/// `bin_name`, and extraction or IO errors otherwise.
pub fn install_binary(
    artifact: &VerifiedArtifact,
    bin_name: &str,
    bin_dir: &Path,
    staging: &Path,
) -> Result<InstalledBinary, InstallError> {
    let format =
        ArtifactFormat::detect(&artifact.asset).ok_or_else(|| InstallError::UnsupportedFormat {
            asset: artifact.asset.clone(),
        })?;

    let extract_dir = staging.join("extract");
    let files = extract::extract(format, &artifact.path, &extract_dir, bin_name)?;
    debug!(
        archive = %artifact.path.display(),
        %format,
        files = files.len(),
        "artifact extracted"
    );

    let source = extract::find_binary(&files, bin_name).ok_or_else(|| {
        InstallError::MissingBinary {
            name: bin_name.to_string(),
        }
    })?;
    debug!(entry = %source.relative_path.display(), "binary located");

    place(&source.absolute_path, bin_dir, bin_name)
}

/// Copy `source` to `bin_dir/bin_name` atomically with mode 0755.
fn place(source: &Path, bin_dir: &Path, bin_name: &str) -> Result<InstalledBinary, InstallError> {
    let not_writable = |source: io::Error| InstallError::NotWritable {
        path: bin_dir.to_path_buf(),
        source,
    };

    fs::create_dir_all(bin_dir).map_err(not_writable)?;
    let mut staged = NamedTempFile::with_prefix_in(format!(".{bin_name}."), bin_dir)
        .map_err(not_writable)?;

    let mut input = fs::File::open(source)?;
    let size = io::copy(&mut input, staged.as_file_mut())?;
    staged.as_file().sync_all()?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(staged.path(), fs::Permissions::from_mode(0o755))?;
    }

    let target = bin_dir.join(bin_name);
    staged
        .persist(&target)
        .map_err(|e| InstallError::NotWritable {
            path: target.clone(),
            source: e.error,
        })?;

    debug!(path = %target.display(), size, "binary placed");
    Ok(InstalledBinary { path: target, size })
}
