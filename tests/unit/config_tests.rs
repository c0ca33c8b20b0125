use std::time::Duration;

use pyrevit_loader::{config::LoaderConfig, AppError};

fn sample_toml(home: &str, root: &str) -> String {
    format!(
        r#"
home_dir = '{home}'
include_home_extensions = true
extension_roots = ['{root}']

[scripts]
interpreter = "python3"
args = ["-u"]
timeout_seconds = 60
patterns = ["*script.py", "*.sh"]

[session]
slow_load_threshold_ms = 1500
"#
    )
}

#[test]
fn parses_full_config() {
    let config = LoaderConfig::from_toml_str(&sample_toml("/opt/pyrevit", "/srv/ext")).expect("valid");
    assert_eq!(config.home_dir.to_str(), Some("/opt/pyrevit"));
    assert_eq!(config.extension_roots.len(), 1);
    assert_eq!(config.scripts.args, vec!["-u".to_owned()]);
    assert_eq!(config.scripts.timeout(), Duration::from_secs(60));
    assert_eq!(config.scripts.patterns.len(), 2);
    assert_eq!(config.session.slow_load_threshold(), Duration::from_millis(1500));
    assert!(config.config_file.is_none());
}

#[test]
fn empty_document_uses_defaults() {
    let config = LoaderConfig::from_toml_str("").expect("valid");
    assert_eq!(config, LoaderConfig::default());
    assert_eq!(config.scripts.interpreter, "python3");
    assert_eq!(config.scripts.timeout_seconds, 300);
    assert_eq!(config.scripts.patterns, vec!["*script.py".to_owned()]);
    assert_eq!(config.session.slow_load_threshold_ms, 3000);
    assert!(config.include_home_extensions);
}

#[test]
fn empty_interpreter_is_rejected() {
    let err = LoaderConfig::from_toml_str("[scripts]\ninterpreter = '  '\n").unwrap_err();
    assert!(matches!(err, AppError::Config(ref msg) if msg.contains("interpreter")));
}

#[test]
fn zero_timeout_is_rejected() {
    let err = LoaderConfig::from_toml_str("[scripts]\ntimeout_seconds = 0\n").unwrap_err();
    assert!(matches!(err, AppError::Config(ref msg) if msg.contains("timeout_seconds")));
}

#[test]
fn invalid_glob_is_rejected() {
    let err = LoaderConfig::from_toml_str("[scripts]\npatterns = ['[script']\n").unwrap_err();
    assert!(matches!(err, AppError::Config(ref msg) if msg.contains("glob")));
}

#[test]
fn blank_patterns_are_rejected() {
    let err = LoaderConfig::from_toml_str("[scripts]\npatterns = ['']\n").unwrap_err();
    assert!(matches!(err, AppError::Config(_)));
}

#[test]
fn empty_root_path_is_rejected() {
    let err = LoaderConfig::from_toml_str("extension_roots = ['']\n").unwrap_err();
    assert!(matches!(err, AppError::Config(ref msg) if msg.contains("extension_roots")));
}

#[test]
fn malformed_toml_is_config_error() {
    let err = LoaderConfig::from_toml_str("extension_roots = [").unwrap_err();
    assert!(err.to_string().starts_with("config:"));
}

#[test]
fn load_from_path_records_config_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "include_home_extensions = false\n").expect("write");

    let config = LoaderConfig::load_from_path(&path).expect("load");
    assert_eq!(config.config_file.as_deref(), Some(path.as_path()));
    assert!(!config.include_home_extensions);
}

#[test]
fn load_from_missing_path_fails() {
    let err = LoaderConfig::load_from_path("/definitely/not/here/config.toml").unwrap_err();
    assert!(matches!(err, AppError::Config(ref msg) if msg.contains("failed to read config")));
}

#[test]
fn ext_root_dirs_orders_home_first_and_skips_missing() {
    let home = tempfile::tempdir().expect("home");
    std::fs::create_dir(home.path().join("extensions")).expect("mkdir");
    let user = tempfile::tempdir().expect("user");

    let config = LoaderConfig {
        home_dir: home.path().to_path_buf(),
        extension_roots: vec![
            user.path().to_path_buf(),
            user.path().join("missing"),
        ],
        ..LoaderConfig::default()
    };

    let roots = config.ext_root_dirs();
    assert_eq!(roots, vec![home.path().join("extensions"), user.path().to_path_buf()]);
}

#[test]
fn ext_root_dirs_drops_duplicates() {
    let user = tempfile::tempdir().expect("user");
    let config = LoaderConfig {
        include_home_extensions: false,
        extension_roots: vec![
            user.path().to_path_buf(),
            user.path().join("."),
            user.path().to_path_buf(),
        ],
        ..LoaderConfig::default()
    };
    assert_eq!(config.ext_root_dirs(), vec![user.path().to_path_buf()]);
}

#[test]
fn home_extensions_can_be_disabled() {
    let home = tempfile::tempdir().expect("home");
    std::fs::create_dir(home.path().join("extensions")).expect("mkdir");
    let config = LoaderConfig {
        home_dir: home.path().to_path_buf(),
        include_home_extensions: false,
        ..LoaderConfig::default()
    };
    assert!(config.ext_root_dirs().is_empty());
}
