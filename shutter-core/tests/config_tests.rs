//! Integration tests for configuration

use shutter_core::config::{configure, sample_config, ConfigFile, ShutterConfig};
use shutter_core::logging;
use std::time::Duration;
use tempfile::TempDir;

#[test]
fn test_config_builder() {
    let config = ShutterConfig::default()
        .with_logging(false)
        .with_single_flight(false)
        .with_capture_timeout(Duration::from_secs(3))
        .with_output_dir("/tmp/shots");

    assert!(!config.logging);
    assert!(!config.single_flight);
    assert_eq!(config.capture_timeout, Some(Duration::from_secs(3)));
    assert_eq!(
        config.output_dir.as_deref(),
        Some(std::path::Path::new("/tmp/shots"))
    );
}

#[test]
fn test_output_dir_must_be_directory() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("not-a-dir");
    std::fs::write(&file, b"x").unwrap();

    let config = ShutterConfig::default().with_output_dir(&file);
    let problems = config.validate();
    assert_eq!(problems.len(), 1);
    assert!(problems[0].contains("not a directory"));
}

#[test]
fn test_configure_toggles_diagnostics() {
    configure(&ShutterConfig::default().with_logging(false));
    assert!(!logging::enabled());

    configure(&ShutterConfig::default());
    assert!(logging::enabled());
}

#[test]
fn test_config_file_roundtrip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("shutter").join("config.toml");

    let mut file = ConfigFile::default();
    file.logging.enabled = false;
    file.capture.timeout_ms = 2500;
    file.capture.output_dir = Some(dir.path().join("out"));
    file.save_to(path.clone()).unwrap();

    let loaded = ConfigFile::load_from(path).unwrap();
    assert_eq!(loaded, file);

    let config = loaded.into_config();
    assert!(!config.logging);
    assert!(config.single_flight);
    assert_eq!(config.capture_timeout, Some(Duration::from_millis(2500)));
}

#[test]
fn test_missing_config_file_uses_defaults() {
    let dir = TempDir::new().unwrap();
    let loaded = ConfigFile::load_from(dir.path().join("absent.toml")).unwrap();
    assert_eq!(loaded, ConfigFile::default());
}

#[test]
fn test_partial_config_file_fills_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[capture]\ntimeout_ms = 100\n").unwrap();

    let loaded = ConfigFile::load_from(path).unwrap();
    assert!(loaded.logging.enabled);
    assert!(loaded.capture.single_flight);
    assert_eq!(loaded.capture.timeout_ms, 100);
}

#[test]
fn test_invalid_config_file_is_config_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[capture\nbroken").unwrap();

    let err = ConfigFile::load_from(path).unwrap_err();
    assert!(err.to_string().starts_with("Configuration error"));
}

#[test]
fn test_sample_config_is_default() {
    let parsed: ConfigFile = toml::from_str(&sample_config()).unwrap();
    assert_eq!(parsed.into_config(), ShutterConfig::default());
}

#[test]
fn test_default_path_location() {
    let path = ConfigFile::default_path();
    assert!(path.ends_with("shutter/config.toml"));
}
