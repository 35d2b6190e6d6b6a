//! Well-known configuration and staging paths

use std::path::PathBuf;

/// Name used for the configuration directory
const APP_NAME: &str = "release-e2e";

/// Directory under the system temp root where CI artifacts are staged
const TMP_DIR_NAME: &str = "react-native-tmp";

/// Default staging directory for downloaded artifacts
///
/// `/tmp/react-native-tmp` on Unix. Never cleaned up automatically, so a
/// second run can inspect what the first one downloaded.
pub fn default_tmp_dir() -> PathBuf {
    std::env::temp_dir().join(TMP_DIR_NAME)
}

/// Get the configuration directory path
///
/// Uses the directories crate for platform-appropriate locations:
/// - Linux: `~/.config/release-e2e/`
/// - macOS: `~/Library/Application Support/release-e2e/`
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the configuration file
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_tmp_dir_is_under_temp_root() {
        let dir = default_tmp_dir();
        assert!(dir.starts_with(std::env::temp_dir()));
        assert!(dir.ends_with(TMP_DIR_NAME));
    }

    #[test]
    fn test_config_path_is_toml() {
        if let Some(path) = config_path() {
            assert_eq!(path.file_name().unwrap(), "config.toml");
        }
    }
}
