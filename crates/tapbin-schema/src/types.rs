//! Release entries, artifact formats and package identifiers.

use serde::{Deserialize, Serialize};

use crate::hash::Sha256Digest;
use crate::platform::{BitWidth, CpuArch, Os, Platform};

/// One platform-specific artifact of a release.
///
/// A formula holds one entry per supported platform. `bits` is only set
/// where a single `(os, arch)` pair ships separate 32-bit and 64-bit
/// artifacts; `None` accepts either width.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseEntry {
    /// Operating system this artifact runs on.
    pub os: Os,
    /// CPU architecture this artifact runs on.
    pub arch: CpuArch,
    /// Required pointer width, if the formula distinguishes it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bits: Option<BitWidth>,
    /// Download URL.
    pub url: String,
    /// Expected SHA-256 of the downloaded bytes.
    pub sha256: Sha256Digest,
}

/// Errors that can occur when validating a [`ReleaseEntry`].
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ReleaseError {
    /// The entry targets an operating system tapbin cannot detect.
    #[error("Unsupported operating system in release entry: {0}")]
    UnsupportedOs(Os),

    /// The entry targets an architecture tapbin cannot detect.
    #[error("Unsupported architecture in release entry: {0}")]
    UnsupportedArch(CpuArch),

    /// The download URL is malformed or uses an unsupported scheme.
    #[error("Invalid URL '{0}': must start with http:// or https://")]
    InvalidUrl(String),
}

impl ReleaseEntry {
    /// Validates the fields the type system cannot.
    ///
    /// # Errors
    ///
    /// Returns [`ReleaseError::UnsupportedOs`] / [`ReleaseError::UnsupportedArch`]
    /// for `other` targets, or [`ReleaseError::InvalidUrl`] for non-HTTP URLs.
    pub fn validate(&self) -> Result<(), ReleaseError> {
        if self.os == Os::Other {
            return Err(ReleaseError::UnsupportedOs(self.os));
        }
        if self.arch == CpuArch::Other {
            return Err(ReleaseError::UnsupportedArch(self.arch));
        }
        if !(self.url.starts_with("https://") || self.url.starts_with("http://")) {
            return Err(ReleaseError::InvalidUrl(self.url.clone()));
        }
        Ok(())
    }

    /// Whether this entry serves the given platform.
    pub fn matches(&self, platform: &Platform) -> bool {
        self.os == platform.os
            && self.arch == platform.arch
            && match (self.bits, platform.bits) {
                (None, _) => true,
                (Some(want), have) => want == have,
            }
    }

    /// Whether some platform would be matched by both entries.
    pub fn overlaps(&self, other: &Self) -> bool {
        self.os == other.os
            && self.arch == other.arch
            && match (self.bits, other.bits) {
                (None, _) | (_, None) => true,
                (Some(a), Some(b)) => a == b,
            }
    }

    /// Human-readable selector, e.g. `linux/arm (64-bit)` or `macos/intel`.
    pub fn selector(&self) -> String {
        match self.bits {
            Some(bits) => format!("{}/{} ({bits})", self.os, self.arch),
            None => format!("{}/{}", self.os, self.arch),
        }
    }

}

const UNSUPPORTED_SUFFIXES: &[&str] = &[
    ".xz", ".txz", ".bz2", ".tbz", ".tbz2", ".lz", ".lzma", ".gz", ".zst", ".7z", ".rar",
    ".dmg", ".pkg", ".msi", ".deb", ".rpm",
];

/// Archive or binary format of a downloadable artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactFormat {
    /// Gzip-compressed tar archive (`.tar.gz` / `.tgz`).
    TarGz,
    /// Zstandard-compressed tar archive (`.tar.zst`).
    TarZst,
    /// Uncompressed tar archive (`.tar`).
    Tar,
    /// Zip archive (`.zip`).
    Zip,
    /// Standalone executable with no archive wrapper.
    Binary,
}

impl ArtifactFormat {
    /// Detect the format from an asset file name.
    ///
    /// Returns `None` for compressed or packaged files that cannot be
    /// unpacked (`.tar.xz`, `.bz2`, `.7z`, ...). Names with no archive
    /// suffix are [`Binary`](Self::Binary).
    pub fn detect(name: &str) -> Option<Self> {
        let name = name.to_lowercase();

        if name.ends_with(".tar.zst") || name.ends_with(".tzst") {
            Some(Self::TarZst)
        } else if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            Some(Self::TarGz)
        } else if name.ends_with(".tar") {
            Some(Self::Tar)
        } else if name.ends_with(".zip") {
            Some(Self::Zip)
        } else if UNSUPPORTED_SUFFIXES.iter().any(|ext| name.ends_with(ext)) {
            None
        } else {
            Some(Self::Binary)
        }
    }
}

impl std::fmt::Display for ArtifactFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::TarGz => "tar.gz",
            Self::TarZst => "tar.zst",
            Self::Tar => "tar",
            Self::Zip => "zip",
            Self::Binary => "binary",
        };
        f.write_str(s)
    }
}

/// A normalized package name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String")]
pub struct PackageName(String);

impl PackageName {
    /// Create a new package name, normalizing the input to lowercase.
    pub fn new(name: &str) -> Self {
        Self(name.to_lowercase())
    }

    /// Return the normalized name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PackageName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::ops::Deref for PackageName {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<str> for PackageName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PackageName {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for PackageName {
    fn from(s: String) -> Self {
        Self::new(&s)
    }
}

/// A release version string.
///
/// Stored as written.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Version(String);

impl Version {
    /// Create a new version from the given string (stored as-is).
    pub fn new(v: &str) -> Self {
        Self(v.to_string())
    }

    /// Return the version string as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the version parses as semver.
    pub fn is_semver(&self) -> bool {
        semver::Version::parse(&self.0).is_ok()
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for Version {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Version {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Version {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl PartialEq<&str> for Version {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}
