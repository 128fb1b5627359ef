use crate::domain::BranchNames;
use crate::error::{ReleaseError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const CONFIG_FILE_NAME: &str = "gitflow-release.toml";

/// Represents the complete configuration for gitflow-release.
///
/// Contains long-lived branch names, remotes, merge ignore lists, the
/// metadata update tool and the optional issue tracker.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub branches: BranchesConfig,

    /// Remotes to check and push to; empty means every configured remote
    #[serde(default)]
    pub remotes: Vec<String>,

    #[serde(default)]
    pub ignore: IgnoreConfig,

    #[serde(default)]
    pub metadata: MetadataConfig,

    #[serde(default)]
    pub tracker: Option<TrackerConfig>,
}

fn default_develop() -> String {
    "develop".to_string()
}

fn default_master() -> String {
    "master".to_string()
}

/// Names of the two long-lived branches.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct BranchesConfig {
    #[serde(default = "default_develop")]
    pub develop: String,

    #[serde(default = "default_master")]
    pub master: String,
}

impl Default for BranchesConfig {
    fn default() -> Self {
        BranchesConfig {
            develop: default_develop(),
            master: default_master(),
        }
    }
}

impl BranchesConfig {
    pub fn names(&self) -> BranchNames {
        BranchNames {
            develop: self.develop.clone(),
            master: self.master.clone(),
        }
    }
}

/// Which ignore list applies to a merge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreList {
    /// Folding a prerelease branch back into its ancestor
    PreReleaseMerge,
    /// Folding a release or hotfix into master / a support branch
    TagStableMerge,
    /// Folding a release or hotfix back into develop
    DevelopStableMerge,
}

/// Path patterns whose merged changes are discarded before the merge commit.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct IgnoreConfig {
    #[serde(default)]
    pub pre_release_merge: Vec<String>,

    #[serde(default)]
    pub tag_stable_merge: Vec<String>,

    #[serde(default)]
    pub develop_stable_merge: Vec<String>,
}

impl IgnoreConfig {
    pub fn patterns(&self, list: IgnoreList) -> &[String] {
        match list {
            IgnoreList::PreReleaseMerge => &self.pre_release_merge,
            IgnoreList::TagStableMerge => &self.tag_stable_merge,
            IgnoreList::DevelopStableMerge => &self.develop_stable_merge,
        }
    }
}

fn default_timeout_secs() -> u64 {
    300
}

/// Configuration of the metadata update step run before each version commit.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct MetadataConfig {
    /// Program and arguments; `{version}` is substituted in arguments
    #[serde(default)]
    pub command: Vec<String>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default)]
    pub files: Vec<VersionFile>,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        MetadataConfig {
            command: Vec::new(),
            timeout_secs: default_timeout_secs(),
            files: Vec::new(),
        }
    }
}

/// A file carrying the version string.
///
/// Without a pattern the whole file is replaced by the version; with one, the
/// first capture group of the first match is replaced.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct VersionFile {
    pub path: String,

    #[serde(default)]
    pub pattern: Option<String>,
}

fn default_token_env() -> String {
    "GITFLOW_TRACKER_TOKEN".to_string()
}

/// Issue tracker connection settings. Secrets are never stored here.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct TrackerConfig {
    pub url: String,
    pub project: String,

    #[serde(default)]
    pub username: Option<String>,

    /// Environment variable holding the API token
    #[serde(default = "default_token_env")]
    pub token_env: String,
}

/// Loads configuration from file or returns defaults.
///
/// Attempts to load configuration in the following order:
/// 1. Custom path provided as parameter
/// 2. `gitflow-release.toml` in current directory
/// 3. `gitflow-release.toml` in the user config directory
/// 4. Default configuration if no file found
pub fn load_config(config_path: Option<&str>) -> Result<Config> {
    let config_str = if let Some(path) = config_path {
        fs::read_to_string(path)?
    } else if Path::new(CONFIG_FILE_NAME).exists() {
        fs::read_to_string(CONFIG_FILE_NAME)?
    } else if let Some(config_dir) = dirs::config_dir() {
        let config_path = config_dir.join(CONFIG_FILE_NAME);
        if config_path.exists() {
            fs::read_to_string(config_path)?
        } else {
            return Ok(Config::default());
        }
    } else {
        return Ok(Config::default());
    };

    parse_config(&config_str)
}

pub fn parse_config(content: &str) -> Result<Config> {
    toml::from_str(content).map_err(|e| ReleaseError::config(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.branches.develop, "develop");
        assert_eq!(config.branches.master, "master");
        assert!(config.remotes.is_empty());
        assert!(config.tracker.is_none());
        assert_eq!(config.metadata.timeout_secs, 300);
    }

    #[test]
    fn test_parse_full_config() {
        let config = parse_config(
            r#"
remotes = ["origin", "mirror"]

[branches]
develop = "dev"

[ignore]
develop_stable_merge = ["VERSION", "ci/*.yml"]

[metadata]
command = ["./bump.sh", "{version}"]
timeout_secs = 20
files = [{ path = "VERSION" }, { path = "Cargo.toml", pattern = '^version = "(.*)"' }]

[tracker]
url = "https://tracker.example.com"
project = "REL"
"#,
        )
        .unwrap();

        assert_eq!(config.remotes, vec!["origin", "mirror"]);
        assert_eq!(config.branches.develop, "dev");
        assert_eq!(config.branches.master, "master");
        assert_eq!(
            config.ignore.patterns(IgnoreList::DevelopStableMerge),
            &["VERSION".to_string(), "ci/*.yml".to_string()]
        );
        assert!(config.ignore.patterns(IgnoreList::TagStableMerge).is_empty());
        assert_eq!(config.metadata.command, vec!["./bump.sh", "{version}"]);
        assert_eq!(config.metadata.files.len(), 2);
        assert_eq!(
            config.metadata.files[1].pattern.as_deref(),
            Some(r#"^version = "(.*)""#)
        );
        let tracker = config.tracker.unwrap();
        assert_eq!(tracker.project, "REL");
        assert_eq!(tracker.token_env, "GITFLOW_TRACKER_TOKEN");
    }

    #[test]
    fn test_parse_invalid_config() {
        let err = parse_config("remotes = 5").unwrap_err();
        assert!(err.to_string().starts_with("Configuration error"));
    }
}
