//! Platform triples used to pick a release entry.
//!
//! A platform is `(os, arch, bits)`. Release entries key on the same three
//! components, with the bit width only mattering where a formula splits a
//! single `(os, arch)` pair (32-bit vs 64-bit ARM Linux).
//!
//! # Example
//!
//! ```
//! use tapbin_schema::Platform;
//!
//! let current = Platform::current();
//! println!("Running on: {current}");
//! ```

use serde::{Deserialize, Serialize};

/// Operating system family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Os {
    /// macOS (Darwin).
    #[serde(alias = "mac", alias = "darwin")]
    Macos,
    /// Linux.
    Linux,
    /// Windows. No release entry in the default formula targets it.
    Windows,
    /// Anything else the host might report.
    #[serde(other)]
    Other,
}

impl Os {
    /// Operating system this binary was compiled for.
    pub fn current() -> Self {
        if cfg!(target_os = "macos") {
            Self::Macos
        } else if cfg!(target_os = "linux") {
            Self::Linux
        } else if cfg!(target_os = "windows") {
            Self::Windows
        } else {
            Self::Other
        }
    }

    /// Lowercase name as used in formula files.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Macos => "macos",
            Self::Linux => "linux",
            Self::Windows => "windows",
            Self::Other => "other",
        }
    }
}

impl std::fmt::Display for Os {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Os {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "macos" | "mac" | "darwin" | "osx" => Ok(Self::Macos),
            "linux" => Ok(Self::Linux),
            "windows" | "win" => Ok(Self::Windows),
            _ => Err(format!("Unknown operating system: {s}")),
        }
    }
}

/// CPU architecture family.
///
/// Homebrew only distinguishes Intel from ARM; the exact flavour
/// (`armv6`, `arm64`) is carried by the bit width and the artifact itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CpuArch {
    /// `x86` / `x86_64`.
    #[serde(alias = "x86_64", alias = "amd64")]
    Intel,
    /// `arm` / `aarch64`.
    #[serde(alias = "arm64", alias = "aarch64")]
    Arm,
    /// Any other architecture.
    #[serde(other)]
    Other,
}

impl CpuArch {
    /// Architecture this binary was compiled for.
    pub fn current() -> Self {
        if cfg!(any(target_arch = "x86", target_arch = "x86_64")) {
            Self::Intel
        } else if cfg!(any(target_arch = "arm", target_arch = "aarch64")) {
            Self::Arm
        } else {
            Self::Other
        }
    }

    /// Lowercase name as used in formula files.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Intel => "intel",
            Self::Arm => "arm",
            Self::Other => "other",
        }
    }
}

impl std::fmt::Display for CpuArch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for CpuArch {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "intel" | "x86_64" | "amd64" | "x86" | "i386" => Ok(Self::Intel),
            "arm" | "arm64" | "aarch64" | "armv6" | "armv7" => Ok(Self::Arm),
            _ => Err(format!("Unknown architecture: {s}")),
        }
    }
}

/// Pointer width of the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum BitWidth {
    /// 32-bit.
    B32,
    /// 64-bit.
    B64,
}

impl BitWidth {
    /// Pointer width this binary was compiled for.
    pub fn current() -> Self {
        if cfg!(target_pointer_width = "32") {
            Self::B32
        } else {
            Self::B64
        }
    }

    /// Width in bits.
    pub fn bits(self) -> u8 {
        match self {
            Self::B32 => 32,
            Self::B64 => 64,
        }
    }
}

impl TryFrom<u8> for BitWidth {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            32 => Ok(Self::B32),
            64 => Ok(Self::B64),
            other => Err(format!("Unsupported bit width: {other} (expected 32 or 64)")),
        }
    }
}

impl From<BitWidth> for u8 {
    fn from(width: BitWidth) -> Self {
        width.bits()
    }
}

impl std::fmt::Display for BitWidth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-bit", self.bits())
    }
}

impl std::str::FromStr for BitWidth {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim_end_matches("-bit").trim_end_matches("bit");
        let value: u8 = trimmed
            .parse()
            .map_err(|_| format!("Invalid bit width: {s}"))?;
        Self::try_from(value)
    }
}

/// A concrete runtime platform: `(os, arch, bits)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Platform {
    /// Operating system.
    pub os: Os,
    /// CPU architecture.
    pub arch: CpuArch,
    /// Pointer width.
    pub bits: BitWidth,
}

impl Platform {
    /// Build a platform triple.
    pub fn new(os: Os, arch: CpuArch, bits: BitWidth) -> Self {
        Self { os, arch, bits }
    }

    /// The platform this binary runs on.
    pub fn current() -> Self {
        Self::new(Os::current(), CpuArch::current(), BitWidth::current())
    }

    /// Replace individual components, keeping the rest.
    pub fn with_overrides(
        self,
        os: Option<Os>,
        arch: Option<CpuArch>,
        bits: Option<BitWidth>,
    ) -> Self {
        Self {
            os: os.unwrap_or(self.os),
            arch: arch.unwrap_or(self.arch),
            bits: bits.unwrap_or(self.bits),
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{} ({})", self.os, self.arch, self.bits)
    }
}
