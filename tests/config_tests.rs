use std::fs;

use kastia::error::{ConfigError, Error};
use kastia::infrastructure::config::logging::LogFormat;
use kastia::infrastructure::config::settings::{Config, EXTERNAL_SECRET_ENV};
use tempfile::TempDir;

#[test]
fn example_config_in_repo_is_valid() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/config.toml");
    let config = Config::load(path).expect("example config loads");
    assert_eq!(config.logging.format, LogFormat::Pretty);
    assert!(config.bind_addr().is_ok());
}

#[test]
fn missing_file_falls_back_to_defaults() {
    let dir = TempDir::new().unwrap();
    let config = Config::load_or_default(dir.path().join("absent.toml")).unwrap();
    assert_eq!(config.database.path, "kastia.db");
}

#[test]
fn unreadable_path_is_reported() {
    let dir = TempDir::new().unwrap();
    let err = Config::load(dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, Error::Config(ConfigError::ReadFile(_))));
}

#[test]
fn file_values_are_validated() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "[auth]\ntoken_length = 500\n").unwrap();
    let err = Config::load(&path).unwrap_err();
    assert!(matches!(
        err,
        Error::Config(ConfigError::InvalidValue {
            field: "auth.token_length",
            ..
        })
    ));
}

#[test]
fn external_secret_comes_from_environment_only() {
    std::env::set_var(EXTERNAL_SECRET_ENV, "from-env");
    let config = Config::parse_toml("[auth]\nexternal_audience = \"authenticated\"\n").unwrap();
    std::env::remove_var(EXTERNAL_SECRET_ENV);
    assert_eq!(config.auth.external_secret.as_deref(), Some("from-env"));
}
