//! Configuration and default output paths

use std::io;
use std::path::PathBuf;

/// Name used for the configuration directory
const APP_NAME: &str = "ime-conform";

/// Default file name for persisted run reports
pub const DEFAULT_REPORT_FILE: &str = "conform-report.json";

/// Get the configuration directory path
///
/// Uses the directories crate for platform-appropriate locations:
/// - Linux: `~/.config/ime-conform/`
/// - macOS: `~/Library/Application Support/ime-conform/`
/// - Windows: `%APPDATA%\ime-conform\`
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", APP_NAME)
        .map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the configuration file
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("config.toml"))
}

/// Ensure the parent directory of an output file exists
pub fn ensure_parent_dir(path: &std::path::Path) -> io::Result<()> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() && !dir.exists() => {
            std::fs::create_dir_all(dir)
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_path_ends_with_toml() {
        if let Some(path) = config_path() {
            assert!(path.ends_with("config.toml"));
        }
    }

    #[test]
    fn test_ensure_parent_dir_creates_nested() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("a").join("b").join("report.json");
        ensure_parent_dir(&target).unwrap();
        assert!(dir.path().join("a").join("b").is_dir());
    }

    #[test]
    fn test_ensure_parent_dir_bare_file_name() {
        ensure_parent_dir(std::path::Path::new("report.json")).unwrap();
    }
}
