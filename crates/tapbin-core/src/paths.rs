use dirs::home_dir;
use std::path::{Path, PathBuf};

/// Returns the tapbin home directory, or None if the user's home cannot be resolved.
///
/// `TAPBIN_HOME` takes precedence over `~/.tapbin`.
pub fn try_tapbin_home() -> Option<PathBuf> {
    if let Ok(val) = std::env::var("TAPBIN_HOME") {
        return Some(PathBuf::from(val));
    }
    home_dir().map(|h| h.join(".tapbin"))
}

/// Binary installation target: `<home>/bin`
pub fn bin_path(home: &Path) -> PathBuf {
    home.join("bin")
}

/// Staging root for downloads and extraction: `<home>/tmp`
pub fn tmp_path(home: &Path) -> PathBuf {
    home.join("tmp")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_is_rooted_at_home() {
        let home = Path::new("/opt/tapbin");
        assert_eq!(bin_path(home), PathBuf::from("/opt/tapbin/bin"));
        assert_eq!(tmp_path(home), PathBuf::from("/opt/tapbin/tmp"));
    }
}
