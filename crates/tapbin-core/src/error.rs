//! Domain-specific errors for the install pipeline

use thiserror::Error;

use crate::formula::FormulaError;
use crate::install::InstallError;
use crate::io::download::DownloadError;
use tapbin_schema::{PackageName, Platform, Sha256Digest, Version};

/// Every way an install run can end early. All variants are terminal.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The formula could not be loaded or is invalid.
    #[error("Invalid formula: {0}")]
    Formula(#[from] FormulaError),

    /// No release entry serves the running platform.
    #[error("No release of {name} {version} for {platform} (available: {available})")]
    NoMatchingPlatform {
        /// Package being installed.
        name: PackageName,
        /// Version being installed.
        version: Version,
        /// Platform that was looked up.
        platform: Platform,
        /// Comma-separated selectors the formula does provide.
        available: String,
    },

    /// Network or transport failure while fetching the artifact.
    #[error("Download failed: {0}")]
    Download(DownloadError),

    /// The fetched bytes do not hash to the recorded checksum.
    #[error("Checksum mismatch for {url}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        /// URL that was fetched.
        url: String,
        /// Digest recorded in the formula.
        expected: Sha256Digest,
        /// Digest of the bytes received.
        actual: Sha256Digest,
    },

    /// Extraction or placement of the binary failed.
    #[error("Install failed: {0}")]
    Install(#[from] InstallError),
}

impl From<DownloadError> for PipelineError {
    fn from(err: DownloadError) -> Self {
        match err {
            DownloadError::ChecksumMismatch {
                url,
                expected,
                actual,
            } => Self::ChecksumMismatch {
                url,
                expected,
                actual,
            },
            other => Self::Download(other),
        }
    }
}
