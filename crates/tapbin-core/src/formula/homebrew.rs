//! Reader for Homebrew formula files.
//!
//! Understands the shape release tooling emits for prebuilt binaries:
//! metadata directives, one `if <predicates>` block per platform holding a
//! `url` and `sha256`, and a `def install` block calling `bin.install`.
//! Arbitrary Ruby is rejected with the offending line number.

use std::sync::LazyLock;

use regex::Regex;

use super::{Formula, FormulaError, InstallSpec, PackageInfo};
use tapbin_schema::{BitWidth, CpuArch, Os, PackageName, ReleaseEntry, Sha256Digest, Version};

static CLASS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^class\s+([A-Z][A-Za-z0-9_]*)\s*<\s*Formula$").expect("static regex")
});
static STRING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^(desc|homepage|version|license|url|sha256)\s+"([^"\\]*)"$"#)
        .expect("static regex")
});
static BOTTLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^bottle\s+:\w+$").expect("static regex"));
static BIN_INSTALL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^bin\.install\s+"([^"\\]+)"$"#).expect("static regex")
});

/// Predicates recognised inside `if` conditions.
#[derive(Debug, Default)]
struct Guard {
    os: Option<Os>,
    arch: Option<CpuArch>,
    bits: Option<BitWidth>,
}

impl Guard {
    fn parse(condition: &str, line: usize) -> Result<Self, FormulaError> {
        let mut guard = Self::default();

        for predicate in condition.split("&&").map(str::trim) {
            match predicate {
                "OS.mac?" => set_once(&mut guard.os, Os::Macos, predicate, line)?,
                "OS.linux?" => set_once(&mut guard.os, Os::Linux, predicate, line)?,
                "Hardware::CPU.intel?" => set_once(&mut guard.arch, CpuArch::Intel, predicate, line)?,
                "Hardware::CPU.arm?" => set_once(&mut guard.arch, CpuArch::Arm, predicate, line)?,
                "Hardware::CPU.is_64_bit?" | "!Hardware::CPU.is_32_bit?" => {
                    set_once(&mut guard.bits, BitWidth::B64, predicate, line)?;
                }
                "Hardware::CPU.is_32_bit?" | "!Hardware::CPU.is_64_bit?" => {
                    set_once(&mut guard.bits, BitWidth::B32, predicate, line)?;
                }
                other => {
                    return Err(FormulaError::Parse {
                        line,
                        message: format!("unsupported condition '{other}'"),
                    });
                }
            }
        }

        if guard.os.is_none() || guard.arch.is_none() {
            return Err(FormulaError::Parse {
                line,
                message: "condition must name both an OS and a CPU family".to_string(),
            });
        }
        Ok(guard)
    }
}

fn set_once<T>(
    slot: &mut Option<T>,
    value: T,
    predicate: &str,
    line: usize,
) -> Result<(), FormulaError> {
    if slot.is_some() {
        return Err(FormulaError::Parse {
            line,
            message: format!("conflicting condition '{predicate}'"),
        });
    }
    *slot = Some(value);
    Ok(())
}

/// Open `if` block being collected.
#[derive(Debug)]
struct PendingEntry {
    guard: Guard,
    url: Option<String>,
    sha256: Option<Sha256Digest>,
    opened_at: usize,
}

impl PendingEntry {
    fn finish(self) -> Result<ReleaseEntry, FormulaError> {
        let url = self.url.ok_or_else(|| FormulaError::Parse {
            line: self.opened_at,
            message: "platform block has no url".to_string(),
        })?;
        let sha256 = self.sha256.ok_or_else(|| FormulaError::Parse {
            line: self.opened_at,
            message: "platform block has no sha256".to_string(),
        })?;

        // Both are guaranteed by Guard::parse.
        let (Some(os), Some(arch)) = (self.guard.os, self.guard.arch) else {
            return Err(FormulaError::Parse {
                line: self.opened_at,
                message: "condition must name both an OS and a CPU family".to_string(),
            });
        };

        Ok(ReleaseEntry {
            os,
            arch,
            bits: self.guard.bits,
            url,
            sha256,
        })
    }
}

enum Scope {
    Preamble,
    Class,
    Platform(PendingEntry),
    Install,
    Done,
}

/// `GraphjinCli` -> `graphjin-cli`
fn formula_name_from_class(class: &str) -> String {
    let mut name = String::with_capacity(class.len() + 4);
    for (i, c) in class.chars().enumerate() {
        if c.is_ascii_uppercase() {
            if i > 0 {
                name.push('-');
            }
            name.push(c.to_ascii_lowercase());
        } else {
            name.push(c);
        }
    }
    name
}

/// Parse a Homebrew formula into a validated [`Formula`].
///
/// # Errors
///
/// Returns [`FormulaError::Parse`] for any line outside the supported
/// subset, and the usual validation errors for the resulting formula.
pub fn parse(source: &str) -> Result<Formula, FormulaError> {
    let mut scope = Scope::Preamble;
    let mut name: Option<String> = None;
    let mut version: Option<String> = None;
    let mut desc: Option<String> = None;
    let mut homepage: Option<String> = None;
    let mut license: Option<String> = None;
    let mut bin: Option<String> = None;
    let mut releases = Vec::new();

    for (idx, raw) in source.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let parse_err = |message: String| FormulaError::Parse {
            line: line_no,
            message,
        };

        scope = match scope {
            Scope::Preamble => {
                let caps = CLASS_RE
                    .captures(line)
                    .ok_or_else(|| parse_err(format!("expected 'class <Name> < Formula', found '{line}'")))?;
                name = Some(formula_name_from_class(&caps[1]));
                Scope::Class
            }
            Scope::Class => {
                if line == "end" {
                    Scope::Done
                } else if line == "def install" {
                    Scope::Install
                } else if let Some(condition) = line.strip_prefix("if ") {
                    Scope::Platform(PendingEntry {
                        guard: Guard::parse(condition, line_no)?,
                        url: None,
                        sha256: None,
                        opened_at: line_no,
                    })
                } else if BOTTLE_RE.is_match(line) {
                    // Bottles never apply to prebuilt releases.
                    Scope::Class
                } else if let Some(caps) = STRING_RE.captures(line) {
                    let slot = match &caps[1] {
                        "desc" => &mut desc,
                        "homepage" => &mut homepage,
                        "version" => &mut version,
                        "license" => &mut license,
                        key => {
                            return Err(parse_err(format!(
                                "'{key}' must appear inside a platform block"
                            )));
                        }
                    };
                    if slot.replace(caps[2].to_string()).is_some() {
                        return Err(parse_err(format!("duplicate '{}'", &caps[1])));
                    }
                    Scope::Class
                } else {
                    return Err(parse_err(format!("unsupported statement '{line}'")));
                }
            }
            Scope::Platform(mut pending) => {
                if line == "end" {
                    releases.push(pending.finish()?);
                    Scope::Class
                } else if let Some(caps) = STRING_RE.captures(line) {
                    let duplicate = match &caps[1] {
                        "url" => pending.url.replace(caps[2].to_string()).is_some(),
                        "sha256" => {
                            let digest =
                                Sha256Digest::new(&caps[2]).map_err(|e| parse_err(e.to_string()))?;
                            pending.sha256.replace(digest).is_some()
                        }
                        key => {
                            return Err(parse_err(format!(
                                "'{key}' is not allowed inside a platform block"
                            )));
                        }
                    };
                    if duplicate {
                        return Err(parse_err(format!("duplicate '{}'", &caps[1])));
                    }
                    Scope::Platform(pending)
                } else {
                    return Err(parse_err(format!("unsupported statement '{line}'")));
                }
            }
            Scope::Install => {
                if line == "end" {
                    Scope::Class
                } else if let Some(caps) = BIN_INSTALL_RE.captures(line) {
                    if bin.replace(caps[1].to_string()).is_some() {
                        return Err(parse_err("only one bin.install is supported".to_string()));
                    }
                    Scope::Install
                } else {
                    return Err(parse_err(format!("unsupported install step '{line}'")));
                }
            }
            Scope::Done => {
                return Err(parse_err(format!("unexpected content after class end: '{line}'")));
            }
        };
    }

    let last_line = source.lines().count();
    match scope {
        Scope::Done => {}
        Scope::Preamble => {
            return Err(FormulaError::Parse {
                line: last_line,
                message: "no formula class found".to_string(),
            });
        }
        Scope::Platform(pending) => {
            return Err(FormulaError::Parse {
                line: pending.opened_at,
                message: "unterminated platform block".to_string(),
            });
        }
        Scope::Class | Scope::Install => {
            return Err(FormulaError::Parse {
                line: last_line,
                message: "missing 'end'".to_string(),
            });
        }
    }

    let name = name.ok_or(FormulaError::MissingField("name"))?;
    let version = version.ok_or(FormulaError::MissingField("version"))?;

    Formula::new(
        PackageInfo {
            name: PackageName::new(&name),
            version: Version::from(version),
            desc: desc.unwrap_or_default(),
            homepage: homepage.unwrap_or_default(),
            license: license.unwrap_or_default(),
        },
        releases,
        InstallSpec { bin },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formula::BUILTIN_FORMULA;

    const SHA: &str = "19a26dbd0f52bf56454dd18206224164657b68702af8c090e133551ba0924de2";

    #[test]
    fn parses_builtin_formula() {
        let formula = parse(BUILTIN_FORMULA).unwrap();
        let info = formula.package();
        assert_eq!(info.name.as_str(), "graphjin");
        assert_eq!(info.version.as_str(), "0.15.91");
        assert_eq!(info.license, "Apache-2.0");
        assert_eq!(info.homepage, "https://graphjin.com");
        assert!(info.desc.starts_with("Build APIs in 5 minutes"));
        assert_eq!(formula.bin_name(), "graphjin");
        assert_eq!(formula.releases().len(), 5);

        let armv6 = &formula.releases()[3];
        assert_eq!(armv6.os, Os::Linux);
        assert_eq!(armv6.arch, CpuArch::Arm);
        assert_eq!(armv6.bits, Some(BitWidth::B32));
        assert!(armv6.url.ends_with("Linux_armv6.tar.gz"));

        let arm64 = &formula.releases()[4];
        assert_eq!(arm64.bits, Some(BitWidth::B64));
        assert!(formula.releases()[0].bits.is_none());
    }

    #[test]
    fn class_names_become_kebab_case() {
        assert_eq!(formula_name_from_class("Graphjin"), "graphjin");
        assert_eq!(formula_name_from_class("GraphjinCli"), "graphjin-cli");
    }

    #[test]
    fn reports_line_of_unknown_condition() {
        let src = format!(
            "class Demo < Formula\n  version \"1.0\"\n  if OS.windows?\n    url \"https://x/y.zip\"\n    sha256 \"{SHA}\"\n  end\nend\n"
        );
        match parse(&src) {
            Err(FormulaError::Parse { line, message }) => {
                assert_eq!(line, 3);
                assert!(message.contains("OS.windows?"), "{message}");
            }
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn rejects_block_without_checksum() {
        let src = "class Demo < Formula\n  version \"1.0\"\n  if OS.linux? && Hardware::CPU.intel?\n    url \"https://x/y.tar.gz\"\n  end\nend\n";
        match parse(src) {
            Err(FormulaError::Parse { line, message }) => {
                assert_eq!(line, 3);
                assert!(message.contains("sha256"));
            }
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn malformed_checksum_is_reported_on_its_own_line() {
        let src = "class Demo < Formula\n  version \"1.0\"\n  if OS.linux? && Hardware::CPU.intel?\n    sha256 \"not-a-digest\"\n    url \"https://x/y.tar.gz\"\n  end\nend\n";
        match parse(src) {
            Err(FormulaError::Parse { line, .. }) => assert_eq!(line, 4),
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn repeated_metadata_is_rejected() {
        for key in ["desc", "homepage", "version", "license"] {
            let src = format!(
                "class Demo < Formula\n  {key} \"first\"\n  {key} \"second\"\nend\n"
            );
            match parse(&src) {
                Err(FormulaError::Parse { line, message }) => {
                    assert_eq!(line, 3, "{key}");
                    assert!(message.contains(&format!("duplicate '{key}'")), "{message}");
                }
                other => panic!("expected parse error for {key}, got {other:?}"),
            }
        }
    }

    #[test]
    fn rejects_arbitrary_ruby() {
        let src = "class Demo < Formula\n  version \"1.0\"\n  depends_on \"go\" => :build\nend\n";
        assert!(matches!(parse(src), Err(FormulaError::Parse { line: 3, .. })));
    }

    #[test]
    fn rejects_unterminated_class() {
        let src = format!(
            "class Demo < Formula\n  version \"1.0\"\n  if OS.linux? && Hardware::CPU.intel?\n    url \"https://x/y.tar.gz\"\n    sha256 \"{SHA}\"\n  end\n"
        );
        assert!(matches!(parse(&src), Err(FormulaError::Parse { .. })));
    }

    #[test]
    fn requires_version() {
        let src = format!(
            "class Demo < Formula\n  if OS.linux? && Hardware::CPU.intel?\n    url \"https://x/y.tar.gz\"\n    sha256 \"{SHA}\"\n  end\nend\n"
        );
        assert!(matches!(parse(&src), Err(FormulaError::MissingField("version"))));
    }

    #[test]
    fn overlapping_blocks_fail_validation() {
        let block = format!(
            "  if OS.linux? && Hardware::CPU.arm?\n    url \"https://x/y.tar.gz\"\n    sha256 \"{SHA}\"\n  end\n"
        );
        let src = format!("class Demo < Formula\n  version \"1.0\"\n{block}{block}end\n");
        assert!(matches!(
            parse(&src),
            Err(FormulaError::OverlappingEntries { .. })
        ));
    }

    #[test]
    fn install_block_defaults_bin_to_name() {
        let src = format!(
            "class Demo < Formula\n  version \"1.0\"\n  if OS.linux? && Hardware::CPU.intel?\n    url \"https://x/y.tar.gz\"\n    sha256 \"{SHA}\"\n  end\nend\n"
        );
        let formula = parse(&src).unwrap();
        assert_eq!(formula.bin_name(), "demo");
    }
}
