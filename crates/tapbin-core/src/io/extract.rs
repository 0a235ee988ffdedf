//! Archive extraction module
//!
//! Handles tar.gz, tar.zst, plain tar, zip and bare executables.

use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::path::{Component, Path, PathBuf};

use thiserror::Error;
use zip::ZipArchive;
use zstd::stream::Decoder as ZstdDecoder;

use tapbin_schema::ArtifactFormat;

/// Errors raised while unpacking an artifact.
#[derive(Error, Debug)]
pub enum ExtractError {
    /// Filesystem or decoder failure.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Malformed or hostile archive content.
    #[error("Archive error: {0}")]
    Archive(String),
}

/// Information about an extracted file
#[derive(Debug, Clone)]
pub struct ExtractedFile {
    /// Path relative to extraction root
    pub relative_path: PathBuf,
    /// Absolute path on disk
    pub absolute_path: PathBuf,
    /// Whether this is an executable
    pub is_executable: bool,
}

/// Reject entries that would land outside the extraction root.
fn checked_relative(path: &Path) -> Result<PathBuf, ExtractError> {
    let mut clean = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => clean.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(ExtractError::Archive(format!(
                    "Invalid path in archive: {}",
                    path.display()
                )));
            }
        }
    }
    Ok(clean)
}

/// Extract a tar.zst archive to a destination directory
///
/// # Errors
///
/// Returns an error if the archive cannot be read or contains unsafe paths.
pub fn extract_tar_zst(
    archive_path: &Path,
    dest_dir: &Path,
) -> Result<Vec<ExtractedFile>, ExtractError> {
    let file = File::open(archive_path)?;
    let reader = BufReader::new(file);
    let zstd_decoder = ZstdDecoder::new(reader)?;

    extract_tar(zstd_decoder, dest_dir)
}

/// Extract a tar.gz archive to a destination directory
///
/// # Errors
///
/// Returns an error if the archive cannot be read or contains unsafe paths.
pub fn extract_tar_gz(
    archive_path: &Path,
    dest_dir: &Path,
) -> Result<Vec<ExtractedFile>, ExtractError> {
    let file = File::open(archive_path)?;
    let reader = BufReader::new(file);
    let gz_decoder = flate2::read::GzDecoder::new(reader);

    extract_tar(gz_decoder, dest_dir)
}

/// Extract a tar archive from a reader
fn extract_tar<R: Read>(reader: R, dest_dir: &Path) -> Result<Vec<ExtractedFile>, ExtractError> {
    fs::create_dir_all(dest_dir)?;

    let mut archive = tar::Archive::new(reader);
    let mut extracted_files = Vec::new();

    for entry in archive.entries()? {
        let mut entry = entry?;
        let entry_type = entry.header().entry_type();

        // Skip directories
        if entry_type.is_dir() {
            continue;
        }
        // Links could point anywhere; release archives never need them.
        if entry_type.is_symlink() || entry_type.is_hard_link() {
            continue;
        }

        let relative_path = checked_relative(&entry.path()?)?;
        if relative_path.as_os_str().is_empty() {
            continue;
        }
        let absolute_path = dest_dir.join(&relative_path);

        if let Some(parent) = absolute_path.parent() {
            fs::create_dir_all(parent)?;
        }

        entry.unpack(&absolute_path)?;

        // Check if executable (Unix mode has execute bit)
        let is_executable = entry
            .header()
            .mode()
            .map(|m| m & 0o111 != 0)
            .unwrap_or(false);

        extracted_files.push(ExtractedFile {
            relative_path,
            absolute_path,
            is_executable,
        });
    }

    Ok(extracted_files)
}

/// Extract a zip archive
///
/// # Errors
///
/// Returns an error if the archive cannot be opened or written out.
pub fn extract_zip(
    archive_path: &Path,
    dest_dir: &Path,
) -> Result<Vec<ExtractedFile>, ExtractError> {
    let file = File::open(archive_path)?;
    let mut archive = ZipArchive::new(file).map_err(|e| ExtractError::Archive(e.to_string()))?;

    fs::create_dir_all(dest_dir)?;
    let mut extracted_files = Vec::new();

    for i in 0..archive.len() {
        let mut file = archive
            .by_index(i)
            .map_err(|e| ExtractError::Archive(e.to_string()))?;
        let Some(relative_path) = file.enclosed_name().map(|p| p.to_path_buf()) else {
            return Err(ExtractError::Archive(format!(
                "Invalid path in archive: {}",
                file.name()
            )));
        };

        if file.is_dir() {
            fs::create_dir_all(dest_dir.join(&relative_path))?;
            continue;
        }

        let absolute_path = dest_dir.join(&relative_path);
        if let Some(p) = absolute_path.parent() {
            fs::create_dir_all(p)?;
        }

        let mut outfile = File::create(&absolute_path)?;
        io::copy(&mut file, &mut outfile)?;

        #[cfg(unix)]
        let is_executable = if let Some(mode) = file.unix_mode() {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&absolute_path, fs::Permissions::from_mode(mode))?;
            mode & 0o111 != 0
        } else {
            false
        };
        #[cfg(not(unix))]
        let is_executable = false;

        extracted_files.push(ExtractedFile {
            relative_path,
            absolute_path,
            is_executable,
        });
    }

    Ok(extracted_files)
}

/// Unpack `archive_path` into `dest_dir` according to `format`.
///
/// A bare [`ArtifactFormat::Binary`] is copied in as `bin_name`.
///
/// # Errors
///
/// Returns an error if the archive cannot be read or contains unsafe paths.
pub fn extract(
    format: ArtifactFormat,
    archive_path: &Path,
    dest_dir: &Path,
    bin_name: &str,
) -> Result<Vec<ExtractedFile>, ExtractError> {
    match format {
        ArtifactFormat::TarZst => extract_tar_zst(archive_path, dest_dir),
        ArtifactFormat::TarGz => extract_tar_gz(archive_path, dest_dir),
        ArtifactFormat::Tar => {
            let file = File::open(archive_path)?;
            extract_tar(BufReader::new(file), dest_dir)
        }
        ArtifactFormat::Zip => extract_zip(archive_path, dest_dir),
        ArtifactFormat::Binary => {
            fs::create_dir_all(dest_dir)?;
            let dest_path = dest_dir.join(bin_name);
            fs::copy(archive_path, &dest_path)?;

            Ok(vec![ExtractedFile {
                relative_path: PathBuf::from(bin_name),
                absolute_path: dest_path,
                is_executable: true,
            }])
        }
    }
}

/// Pick the extracted file the install step should copy.
///
/// Among entries named `name`, executables win over plain files, then the
/// shallowest path: the archive root before a `tool-1.0/` wrapper before
/// anything nested deeper. Ties go to the lexically first path.
pub fn find_binary<'a>(files: &'a [ExtractedFile], name: &str) -> Option<&'a ExtractedFile> {
    files
        .iter()
        .filter(|f| f.relative_path.file_name().is_some_and(|n| n == name))
        .min_by(|a, b| {
            b.is_executable
                .cmp(&a.is_executable)
                .then_with(|| {
                    a.relative_path
                        .components()
                        .count()
                        .cmp(&b.relative_path.components().count())
                })
                .then_with(|| a.relative_path.cmp(&b.relative_path))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;

    fn write_tar_gz(path: &Path, files: &[(&str, &[u8], u32)]) {
        let file = File::create(path).unwrap();
        let encoder = GzEncoder::new(file, Compression::default());
        let mut builder = tar::Builder::new(encoder);
        for (name, data, mode) in files {
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(*mode);
            header.set_cksum();
            builder.append_data(&mut header, name, *data).unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap();
    }

    #[test]
    fn extracts_tar_gz_and_flags_executables() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("tool.tar.gz");
        write_tar_gz(
            &archive,
            &[
                ("tool", b"#!/bin/sh\necho hi\n", 0o755),
                ("README.md", b"docs", 0o644),
            ],
        );

        let out = dir.path().join("out");
        let files = extract(ArtifactFormat::TarGz, &archive, &out, "tool").unwrap();
        assert_eq!(files.len(), 2);
        let tool = files
            .iter()
            .find(|f| f.relative_path == Path::new("tool"))
            .unwrap();
        assert!(tool.is_executable);
        assert_eq!(fs::read(out.join("README.md")).unwrap(), b"docs");
    }

    #[test]
    fn rejects_parent_dir_components() {
        assert!(checked_relative(Path::new("../escape")).is_err());
        assert!(checked_relative(Path::new("/etc/passwd")).is_err());
        assert_eq!(
            checked_relative(Path::new("./a/b")).unwrap(),
            PathBuf::from("a/b")
        );
    }

    #[test]
    fn bare_binary_is_copied_under_bin_name() {
        let dir = tempfile::tempdir().unwrap();
        let download = dir.path().join("tool_linux_amd64");
        fs::write(&download, b"\x7fELF").unwrap();

        let out = dir.path().join("out");
        let files = extract(ArtifactFormat::Binary, &download, &out, "tool").unwrap();
        assert_eq!(files[0].absolute_path, out.join("tool"));
        assert_eq!(fs::read(out.join("tool")).unwrap(), b"\x7fELF");
    }

    fn file(path: &str, is_executable: bool) -> ExtractedFile {
        ExtractedFile {
            relative_path: PathBuf::from(path),
            absolute_path: Path::new("/staging").join(path),
            is_executable,
        }
    }

    #[test]
    fn find_binary_prefers_executables_then_shallow_paths() {
        let files = [
            file("b/c/bin/tool", true),
            file("a/bin/tool", true),
            file("tool-1.0/tool", true),
            file("tool-1.0/README.md", false),
        ];
        let found = find_binary(&files, "tool").unwrap();
        assert_eq!(found.relative_path, Path::new("tool-1.0/tool"));

        // A non-executable file at the root loses to an executable one below it.
        let files = [file("tool", false), file("dist/tool", true)];
        let found = find_binary(&files, "tool").unwrap();
        assert_eq!(found.relative_path, Path::new("dist/tool"));

        // Zip entries without mode bits still resolve.
        let files = [file("tool", false)];
        assert!(find_binary(&files, "tool").is_some());

        assert!(find_binary(&files, "missing").is_none());
        assert!(find_binary(&[file("tools", true)], "tool").is_none());
    }
}
