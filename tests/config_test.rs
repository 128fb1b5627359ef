// tests/config_test.rs
use gitflow_release::config::{load_config, Config, IgnoreList, CONFIG_FILE_NAME};
use serial_test::serial;
use std::env;
use std::fs;
use std::io::Write;
use tempfile::{NamedTempFile, TempDir};

#[test]
fn test_load_default_config() {
    let config = Config::default();
    assert_eq!(config.branches.develop, "develop");
    assert_eq!(config.branches.master, "master");
    assert_eq!(config.metadata.timeout_secs, 300);
    assert!(config.metadata.command.is_empty());
    assert!(config.tracker.is_none());
}

#[test]
fn test_load_from_file() {
    let mut temp_file = NamedTempFile::new().unwrap();
    let toml_content = r#"
remotes = ["origin", "mirror"]

[branches]
develop = "dev"
master = "main"

[ignore]
pre_release_merge = ["VERSION"]
develop_stable_merge = ["VERSION", "docs/changelog/*"]

[metadata]
command = ["./scripts/set-version.sh", "{version}"]
timeout_secs = 60

[[metadata.files]]
path = "Cargo.toml"
pattern = '(?m)^version = "([^"]+)"'

[tracker]
url = "https://tracker.example.com"
project = "REL"
username = "builder"
"#;
    temp_file.write_all(toml_content.as_bytes()).unwrap();
    temp_file.flush().unwrap();

    let config = load_config(Some(temp_file.path().to_str().unwrap())).unwrap();
    assert_eq!(config.branches.develop, "dev");
    assert_eq!(config.branches.master, "main");
    assert_eq!(config.remotes, vec!["origin", "mirror"]);
    assert_eq!(
        config.ignore.patterns(IgnoreList::DevelopStableMerge),
        ["VERSION", "docs/changelog/*"]
    );
    assert!(config.ignore.patterns(IgnoreList::TagStableMerge).is_empty());
    assert_eq!(config.metadata.timeout_secs, 60);
    assert_eq!(config.metadata.files.len(), 1);
    assert_eq!(config.metadata.files[0].path, "Cargo.toml");

    let tracker = config.tracker.unwrap();
    assert_eq!(tracker.project, "REL");
    assert_eq!(tracker.username.as_deref(), Some("builder"));
    assert_eq!(tracker.token_env, "GITFLOW_TRACKER_TOKEN");
}

#[test]
fn test_invalid_file_is_config_error() {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(b"remotes = \"origin\"\n").unwrap();
    temp_file.flush().unwrap();

    let err = load_config(Some(temp_file.path().to_str().unwrap())).unwrap_err();
    assert!(matches!(err, gitflow_release::ReleaseError::Config(_)));
}

#[test]
#[serial]
fn test_config_in_current_directory_is_found() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join(CONFIG_FILE_NAME),
        "[branches]\nmaster = \"stable\"\n",
    )
    .unwrap();

    let original = env::current_dir().unwrap();
    env::set_current_dir(dir.path()).unwrap();
    let result = load_config(None);
    env::set_current_dir(original).unwrap();

    let config = result.unwrap();
    assert_eq!(config.branches.master, "stable");
    assert_eq!(config.branches.develop, "develop");
}
