//! Configuration file handling

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::paths::{config_path, default_tmp_dir};
use super::Result;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    /// CircleCI API settings
    #[serde(default)]
    pub circleci: CircleCiConfig,

    /// Filesystem locations
    #[serde(default)]
    pub paths: PathsConfig,

    /// JS bundler settings
    #[serde(default)]
    pub bundler: BundlerConfig,

    /// Emulator/device settings
    #[serde(default)]
    pub device: DeviceConfig,
}

/// CircleCI API settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CircleCiConfig {
    /// Base URL of the versioned REST API
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// GitHub organization owning the project
    #[serde(default = "default_org")]
    pub org: String,

    /// GitHub repository name
    #[serde(default = "default_repo")]
    pub repo: String,

    /// Workflow producing the release packages
    #[serde(default = "default_release_workflow")]
    pub release_workflow: String,

    /// Workflow producing the test APKs
    #[serde(default = "default_tests_workflow")]
    pub tests_workflow: String,
}

impl Default for CircleCiConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            org: default_org(),
            repo: default_repo(),
            release_workflow: default_release_workflow(),
            tests_workflow: default_tests_workflow(),
        }
    }
}

fn default_api_base() -> String {
    "https://circleci.com/api/v2".to_string()
}
fn default_org() -> String {
    "facebook".to_string()
}
fn default_repo() -> String {
    "react-native".to_string()
}
fn default_release_workflow() -> String {
    "package_and_publish_release_dryrun".to_string()
}
fn default_tests_workflow() -> String {
    "tests".to_string()
}

/// Filesystem locations
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PathsConfig {
    /// Staging directory for downloaded artifacts
    #[serde(default = "default_tmp_dir")]
    pub tmp_dir: PathBuf,

    /// Root of the framework checkout (defaults to the working directory)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo_root: Option<PathBuf>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            tmp_dir: default_tmp_dir(),
            repo_root: None,
        }
    }
}

impl PathsConfig {
    /// Resolve the framework checkout root
    pub fn repo_root(&self) -> Result<PathBuf> {
        match &self.repo_root {
            Some(root) => Ok(root.clone()),
            None => Ok(std::env::current_dir()?),
        }
    }
}

/// JS bundler settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BundlerConfig {
    /// Port the bundler listens on
    #[serde(default = "default_bundler_port")]
    pub port: u16,
}

impl Default for BundlerConfig {
    fn default() -> Self {
        Self {
            port: default_bundler_port(),
        }
    }
}

fn default_bundler_port() -> u16 {
    8081
}

/// Emulator/device settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DeviceConfig {
    /// How long to wait for a launched emulator to show up in `adb devices`
    #[serde(default = "default_boot_timeout")]
    pub boot_timeout_secs: u64,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            boot_timeout_secs: default_boot_timeout(),
        }
    }
}

fn default_boot_timeout() -> u64 {
    120
}

impl Config {
    /// Load configuration from the default config file
    ///
    /// Returns default configuration if file doesn't exist
    pub fn load() -> Result<Self> {
        if let Some(path) = config_path() {
            if path.exists() {
                return Self::load_from(&path);
            }
        }
        Ok(Self::default())
    }

    /// Load configuration from an explicit path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| super::Error::FileRead {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;
        toml::from_str(&content).map_err(|e| super::Error::ConfigParse(e.to_string()))
    }

    /// Render the effective configuration as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| super::Error::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.circleci.org, "facebook");
        assert_eq!(config.circleci.repo, "react-native");
        assert_eq!(config.circleci.release_workflow, "package_and_publish_release_dryrun");
        assert_eq!(config.circleci.tests_workflow, "tests");
        assert_eq!(config.bundler.port, 8081);
        assert_eq!(config.paths.tmp_dir, default_tmp_dir());
    }

    #[test]
    fn test_partial_override() {
        let config: Config = toml::from_str(
            r#"
            [circleci]
            repo = "react-native-fork"

            [bundler]
            port = 9090
            "#,
        )
        .unwrap();
        assert_eq!(config.circleci.repo, "react-native-fork");
        assert_eq!(config.circleci.org, "facebook");
        assert_eq!(config.bundler.port, 9090);
        assert_eq!(config.device.boot_timeout_secs, 120);
    }

    #[test]
    fn test_effective_config_renders_as_toml() {
        let rendered = Config::default().to_toml().unwrap();
        let reparsed: Config = toml::from_str(&rendered).unwrap();
        assert_eq!(reparsed.circleci.api_base, "https://circleci.com/api/v2");
        assert!(reparsed.paths.repo_root.is_none());
    }

    #[test]
    fn test_load_from_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[bundler]\nport = \"nope\"").unwrap();
        let err = Config::load_from(&path).unwrap_err();
        assert!(matches!(err, super::super::Error::ConfigParse(_)));
    }
}
