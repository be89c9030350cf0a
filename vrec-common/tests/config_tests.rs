//! Tests for configuration loading and root folder resolution
//!
//! Tests that manipulate VREC_ROOT_FOLDER or VREC_ROOT are marked #[serial]
//! so they never race on process environment.

use serial_test::serial;
use std::env;
use std::path::PathBuf;
use tempfile::TempDir;
use vrec_common::config::{
    CompiledDefaults, EngineSettings, LoggingConfig, RootFolderInitializer, RootFolderResolver,
    TomlConfig, ENV_ROOT, ENV_ROOT_FOLDER,
};

fn clear_env() {
    env::remove_var(ENV_ROOT_FOLDER);
    env::remove_var(ENV_ROOT);
}

#[test]
fn test_compiled_defaults_for_current_platform() {
    let defaults = CompiledDefaults::for_current_platform();

    assert!(!defaults.root_folder.as_os_str().is_empty());
    assert_eq!(defaults.log_level, "info");
}

#[test]
#[serial]
fn test_cli_arg_takes_precedence() {
    clear_env();
    env::set_var(ENV_ROOT_FOLDER, "/tmp/vrec-env-folder");

    let resolver = RootFolderResolver::new("test-module")
        .with_cli_arg(Some(PathBuf::from("/tmp/vrec-cli")));

    assert_eq!(resolver.resolve(), PathBuf::from("/tmp/vrec-cli"));
    clear_env();
}

#[test]
#[serial]
fn test_resolver_env_var_root_folder() {
    clear_env();
    env::set_var(ENV_ROOT_FOLDER, "/tmp/vrec-test-env-folder");

    let resolver = RootFolderResolver::new("test-module").with_config(TomlConfig::default());

    assert_eq!(resolver.resolve(), PathBuf::from("/tmp/vrec-test-env-folder"));
    clear_env();
}

#[test]
#[serial]
fn test_root_folder_takes_precedence_over_root() {
    clear_env();
    env::set_var(ENV_ROOT_FOLDER, "/tmp/vrec-priority-1");
    env::set_var(ENV_ROOT, "/tmp/vrec-priority-2");

    let resolver = RootFolderResolver::new("test-module").with_config(TomlConfig::default());

    assert_eq!(resolver.resolve(), PathBuf::from("/tmp/vrec-priority-1"));
    clear_env();
}

#[test]
#[serial]
fn test_toml_root_folder_used_without_env() {
    clear_env();
    let config = TomlConfig {
        root_folder: Some(PathBuf::from("/tmp/vrec-from-toml")),
        ..TomlConfig::default()
    };

    let resolver = RootFolderResolver::new("test-module").with_config(config);

    assert_eq!(resolver.resolve(), PathBuf::from("/tmp/vrec-from-toml"));
}

#[test]
#[serial]
fn test_resolver_with_no_overrides_uses_default() {
    clear_env();

    let resolver = RootFolderResolver::new("test-module").with_config(TomlConfig::default());

    assert_eq!(
        resolver.resolve(),
        CompiledDefaults::for_current_platform().root_folder
    );
}

#[test]
fn test_toml_config_partial_file_uses_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("recommendation-engine.toml");
    std::fs::write(
        &path,
        r#"
root_folder = "/srv/vrec"

[engine]
class_top_n = 4
"#,
    )
    .unwrap();

    let config = TomlConfig::from_file(&path).unwrap();

    assert_eq!(config.root_folder, Some(PathBuf::from("/srv/vrec")));
    assert_eq!(config.logging, LoggingConfig::default());
    assert_eq!(config.engine.class_top_n, 4);
    assert_eq!(config.engine.student_top_n, 3);
    assert_eq!(config.engine.top_words_limit, 10);
}

#[test]
fn test_toml_config_malformed_file_is_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.toml");
    std::fs::write(&path, "root_folder = [unterminated").unwrap();

    assert!(TomlConfig::from_file(&path).is_err());
}

#[test]
fn test_engine_settings_validation() {
    assert!(EngineSettings::default().validate().is_ok());

    let zero = EngineSettings {
        student_top_n: 0,
        ..EngineSettings::default()
    };
    assert!(zero.validate().is_err());
}

#[test]
fn test_initializer_creates_directory() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("vrec-root");

    let initializer = RootFolderInitializer::new(root.clone());
    initializer.ensure_directory_exists().unwrap();

    assert!(root.is_dir());
    assert_eq!(initializer.database_path(), root.join("vrec.db"));
}
