//! Formula definition parsing
//!
//! A formula is read either from the TOML form or from the subset of the
//! Homebrew Ruby DSL that release tooling generates. Both produce the same
//! validated, immutable [`Formula`].

pub mod homebrew;

use std::fs;
use std::path::Path;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use tapbin_schema::{PackageName, Platform, ReleaseEntry, ReleaseError, Version};

/// Source of the formula that ships inside the binary.
pub const BUILTIN_FORMULA: &str = include_str!("../../formulas/graphjin.rb");

static BUILTIN: OnceLock<Formula> = OnceLock::new();

/// Errors that can occur when loading or validating a formula.
#[derive(Error, Debug)]
pub enum FormulaError {
    /// An I/O error occurred while reading a formula file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The TOML content could not be deserialized.
    #[error("Parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// The formula could not be rendered as TOML.
    #[error("Render error: {0}")]
    Render(#[from] toml::ser::Error),

    /// A line of a Homebrew formula could not be understood.
    #[error("line {line}: {message}")]
    Parse {
        /// 1-based line number.
        line: usize,
        /// What went wrong.
        message: String,
    },

    /// A required field is empty or missing.
    #[error("Missing field: {0}")]
    MissingField(&'static str),

    /// The formula declares no release entries at all.
    #[error("Formula '{0}' has no release entries")]
    NoReleases(PackageName),

    /// A release entry failed validation.
    #[error("Release entry #{index}: {source}")]
    InvalidRelease {
        /// 1-based position in the formula.
        index: usize,
        /// Underlying validation failure.
        source: ReleaseError,
    },

    /// Two entries could both match the same platform.
    #[error("Release entries '{first}' and '{second}' match the same platform")]
    OverlappingEntries {
        /// Selector of the earlier entry.
        first: String,
        /// Selector of the later entry.
        second: String,
    },

    /// The install binary name is not a plain file name.
    #[error("Invalid binary name '{0}': must be a single path component")]
    InvalidBin(String),
}

/// Descriptive metadata. None of it affects installation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageInfo {
    /// Unique name that identifies the package.
    pub name: PackageName,
    /// Release version.
    pub version: Version,
    /// Short human-readable summary.
    #[serde(default)]
    pub desc: String,
    /// URL of the project's homepage.
    #[serde(default)]
    pub homepage: String,
    /// SPDX license identifier.
    #[serde(default)]
    pub license: String,
}

/// The install action: which file from the artifact goes on the search path.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InstallSpec {
    /// Binary to install (defaults to the package name).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bin: Option<String>,
}

impl InstallSpec {
    /// Returns the binary name, falling back to the package name.
    pub fn effective_bin<'a>(&'a self, pkg_name: &'a str) -> &'a str {
        self.bin.as_deref().unwrap_or(pkg_name)
    }
}

/// A validated formula.
///
/// Construction checks that every entry is well-formed and that no two
/// entries can match the same platform, so lookups never have to pick
/// between candidates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "RawFormula")]
pub struct Formula {
    package: PackageInfo,
    #[serde(rename = "release")]
    releases: Vec<ReleaseEntry>,
    install: InstallSpec,
}

#[derive(Deserialize)]
struct RawFormula {
    package: PackageInfo,
    #[serde(rename = "release", default)]
    releases: Vec<ReleaseEntry>,
    #[serde(default)]
    install: InstallSpec,
}

impl TryFrom<RawFormula> for Formula {
    type Error = FormulaError;

    fn try_from(raw: RawFormula) -> Result<Self, Self::Error> {
        Self::new(raw.package, raw.releases, raw.install)
    }
}

impl Formula {
    /// Build and validate a formula.
    ///
    /// # Errors
    ///
    /// Returns a [`FormulaError`] if the name or version is empty, there are
    /// no entries, an entry is invalid, two entries overlap, or the binary
    /// name is not a plain file name.
    pub fn new(
        package: PackageInfo,
        releases: Vec<ReleaseEntry>,
        install: InstallSpec,
    ) -> Result<Self, FormulaError> {
        if package.name.is_empty() {
            return Err(FormulaError::MissingField("name"));
        }
        if package.version.as_str().is_empty() {
            return Err(FormulaError::MissingField("version"));
        }
        if releases.is_empty() {
            return Err(FormulaError::NoReleases(package.name));
        }

        for (i, entry) in releases.iter().enumerate() {
            entry
                .validate()
                .map_err(|source| FormulaError::InvalidRelease {
                    index: i + 1,
                    source,
                })?;
        }

        for (i, a) in releases.iter().enumerate() {
            if let Some(b) = releases[i + 1..].iter().find(|b| a.overlaps(b)) {
                return Err(FormulaError::OverlappingEntries {
                    first: a.selector(),
                    second: b.selector(),
                });
            }
        }

        let bin = install.effective_bin(&package.name);
        if bin.is_empty() || bin.contains(['/', '\\']) || bin == "." || bin == ".." {
            return Err(FormulaError::InvalidBin(bin.to_string()));
        }

        Ok(Self {
            package,
            releases,
            install,
        })
    }

    /// Parse a formula file, choosing the syntax from its extension.
    ///
    /// `.rb` files are read as Homebrew formulae; anything else as TOML.
    ///
    /// # Errors
    ///
    /// Returns `FormulaError::Io` if the file cannot be read, or a parse /
    /// validation error for its content.
    pub fn from_file(path: &Path) -> Result<Self, FormulaError> {
        let content = fs::read_to_string(path)?;
        if path.extension().is_some_and(|ext| ext == "rb") {
            homebrew::parse(&content)
        } else {
            Self::parse_toml(&content)
        }
    }

    /// Parse a formula from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns `FormulaError::Toml` if the content is invalid or fails validation.
    pub fn parse_toml(content: &str) -> Result<Self, FormulaError> {
        Ok(toml::from_str(content)?)
    }

    /// The formula compiled into the binary, parsed on first use.
    ///
    /// # Errors
    ///
    /// Only fails if the embedded source is itself invalid.
    pub fn builtin() -> Result<&'static Self, FormulaError> {
        if let Some(formula) = BUILTIN.get() {
            return Ok(formula);
        }
        let parsed = homebrew::parse(BUILTIN_FORMULA)?;
        Ok(BUILTIN.get_or_init(|| parsed))
    }

    /// Render the formula in TOML form.
    ///
    /// # Errors
    ///
    /// Returns `FormulaError::Render` if serialization fails.
    pub fn to_toml(&self) -> Result<String, FormulaError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// The single entry serving `platform`, if any.
    pub fn entry_for(&self, platform: &Platform) -> Option<&ReleaseEntry> {
        self.releases.iter().find(|e| e.matches(platform))
    }

    /// Package metadata.
    pub fn package(&self) -> &PackageInfo {
        &self.package
    }

    /// Package name.
    pub fn name(&self) -> &PackageName {
        &self.package.name
    }

    /// Release version.
    pub fn version(&self) -> &Version {
        &self.package.version
    }

    /// All release entries in declaration order.
    pub fn releases(&self) -> &[ReleaseEntry] {
        &self.releases
    }

    /// Name of the binary the install step places on the search path.
    pub fn bin_name(&self) -> &str {
        self.install.effective_bin(&self.package.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tapbin_schema::{BitWidth, CpuArch, Os};

    const SHA_A: &str = "59fb7050371ae3fadb8e2064f711e2be6f1a1d9e33d3dd8eb9a1bea712518f9d";
    const SHA_B: &str = "56d37ba80b20e2607ce7c2dd45742ba7551e61d45c909cc29d9ef1e728ee842c";

    fn toml_with(releases: &str) -> String {
        format!(
            r#"
[package]
name = "demo"
version = "1.2.3"
desc = "A demo tool"
license = "MIT"

{releases}
"#
        )
    }

    #[test]
    fn parses_toml_formula() {
        let src = toml_with(&format!(
            r#"
[[release]]
os = "macos"
arch = "intel"
url = "https://example.com/demo_1.2.3_Darwin_x86_64.tar.gz"
sha256 = "{SHA_A}"

[[release]]
os = "linux"
arch = "arm"
bits = 32
url = "https://example.com/demo_1.2.3_Linux_armv6.tar.gz"
sha256 = "{SHA_B}"

[install]
bin = "demo-cli"
"#
        ));
        let formula = Formula::parse_toml(&src).unwrap();
        assert_eq!(formula.name().as_str(), "demo");
        assert_eq!(formula.version().as_str(), "1.2.3");
        assert_eq!(formula.releases().len(), 2);
        assert_eq!(formula.releases()[1].bits, Some(BitWidth::B32));
        assert_eq!(formula.bin_name(), "demo-cli");
    }

    #[test]
    fn bin_defaults_to_package_name() {
        let src = toml_with(&format!(
            r#"
[[release]]
os = "linux"
arch = "intel"
url = "https://example.com/demo.tar.gz"
sha256 = "{SHA_A}"
"#
        ));
        let formula = Formula::parse_toml(&src).unwrap();
        assert_eq!(formula.bin_name(), "demo");
    }

    #[test]
    fn rejects_overlapping_entries() {
        let src = toml_with(&format!(
            r#"
[[release]]
os = "linux"
arch = "arm"
url = "https://example.com/a.tar.gz"
sha256 = "{SHA_A}"

[[release]]
os = "linux"
arch = "arm"
bits = 64
url = "https://example.com/b.tar.gz"
sha256 = "{SHA_B}"
"#
        ));
        let err = Formula::parse_toml(&src).unwrap_err();
        assert!(err.to_string().contains("match the same platform"), "{err}");
    }

    #[test]
    fn rejects_bad_checksum_and_empty_release_list() {
        let src = toml_with(
            r#"
[[release]]
os = "linux"
arch = "arm"
url = "https://example.com/a.tar.gz"
sha256 = "abc123"
"#,
        );
        assert!(Formula::parse_toml(&src).is_err());

        let err = Formula::parse_toml(&toml_with("")).unwrap_err();
        assert!(err.to_string().contains("no release entries"), "{err}");
    }

    #[test]
    fn rejects_path_like_bin() {
        let info = PackageInfo {
            name: PackageName::new("demo"),
            version: Version::new("1.0.0"),
            desc: String::new(),
            homepage: String::new(),
            license: String::new(),
        };
        let entry = ReleaseEntry {
            os: Os::Linux,
            arch: CpuArch::Intel,
            bits: None,
            url: "https://example.com/demo.tar.gz".to_string(),
            sha256: SHA_A.parse().unwrap(),
        };
        let install = InstallSpec {
            bin: Some("../demo".to_string()),
        };
        let err = Formula::new(info, vec![entry], install).unwrap_err();
        assert!(matches!(err, FormulaError::InvalidBin(_)));
    }

    #[test]
    fn toml_round_trips_through_render() {
        let formula = Formula::builtin().unwrap();
        let rendered = formula.to_toml().unwrap();
        assert!(rendered.contains("[[release]]"));
        let reparsed = Formula::parse_toml(&rendered).unwrap();
        assert_eq!(reparsed.releases(), formula.releases());
        assert_eq!(reparsed.bin_name(), "graphjin");
        assert_eq!(reparsed.package().license, "Apache-2.0");
    }

    #[test]
    fn from_file_dispatches_on_extension() {
        let dir = tempfile::tempdir().unwrap();
        let rb = dir.path().join("graphjin.rb");
        fs::write(&rb, BUILTIN_FORMULA).unwrap();
        let formula = Formula::from_file(&rb).unwrap();
        assert_eq!(formula.releases().len(), 5);

        let toml_path = dir.path().join("graphjin.toml");
        fs::write(&toml_path, formula.to_toml().unwrap()).unwrap();
        let again = Formula::from_file(&toml_path).unwrap();
        assert_eq!(again.version().as_str(), "0.15.91");
    }
}
