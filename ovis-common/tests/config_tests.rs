//! Integration tests for configuration loading and resolution
//!
//! Note: Uses serial_test crate to prevent ENV variable race conditions.
//! Tests that manipulate OVIS_* variables are marked with #[serial]
//! to ensure they run sequentially, not in parallel.

use ovis_common::config::{resolve_config_path, ConfigSource, TomlConfig, CONFIG_PATH_ENV};
use serial_test::serial;
use std::env;
use std::fs;
use tempfile::TempDir;

fn clear_env() {
    for name in [
        CONFIG_PATH_ENV,
        "OVIS_INFLUX_URL",
        "OVIS_INFLUX_ORG",
        "OVIS_INFLUX_BUCKET",
        "OVIS_INFLUX_TOKEN",
        "OVIS_LOG_LEVEL",
    ] {
        env::remove_var(name);
    }
}

#[test]
#[serial]
fn test_load_full_config_file() {
    clear_env();
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.toml");
    fs::write(
        &path,
        r#"
        [pipeline]
        window_length = 20
        chunk_size = 2000
        time_column = "timestamp"
        labels = ["grazing", "lying", "walking"]
        source_utc_offset = "+12:00"

        [influx]
        url = "http://influx.local:8086"
        org = "farm"
        bucket = "flock"

        [logging]
        level = "debug"
        "#,
    )
    .unwrap();

    let config = TomlConfig::load_or_default(Some(&path)).unwrap();

    assert_eq!(config.pipeline.window_length, 20);
    assert_eq!(config.pipeline.chunk_size, 2000);
    assert_eq!(config.pipeline.time_column, "timestamp");
    assert_eq!(config.pipeline.labels.len(), 3);
    assert_eq!(config.pipeline.utc_offset().unwrap().local_minus_utc(), 12 * 3600);
    assert_eq!(config.influx.url, "http://influx.local:8086");
    assert_eq!(config.influx.bucket, "flock");
    assert!(config.influx.token.is_none());
    assert_eq!(config.logging.level, "debug");
}

#[test]
#[serial]
fn test_missing_file_falls_back_to_defaults() {
    clear_env();
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("does-not-exist.toml");

    let config = TomlConfig::load_or_default(Some(&path)).unwrap();

    assert_eq!(config.pipeline.window_length, 30);
    assert_eq!(config.pipeline.chunk_size, 30_000);
}

#[test]
#[serial]
fn test_load_with_source_reports_missing_file() {
    clear_env();
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("absent.toml");

    let (config, source) = TomlConfig::load_with_source(Some(&path)).unwrap();

    assert_eq!(source, ConfigSource::Missing(path));
    assert!(source.is_default());
    assert_eq!(config.logging.level, "info");
}

#[test]
#[serial]
fn test_load_with_source_reports_file() {
    clear_env();
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("present.toml");
    fs::write(&path, "[logging]\nlevel = \"warn\"\n").unwrap();

    let (config, source) = TomlConfig::load_with_source(Some(&path)).unwrap();

    assert_eq!(source, ConfigSource::File(path));
    assert!(!source.is_default());
    assert_eq!(config.logging.level, "warn");
}

#[test]
#[serial]
fn test_malformed_existing_file_is_error() {
    clear_env();
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("broken.toml");
    fs::write(&path, "[pipeline]\nwindow_length = [").unwrap();

    let result = TomlConfig::load_or_default(Some(&path));

    let message = result.unwrap_err().to_string();
    assert!(message.contains("Configuration error"));
    assert!(message.contains("broken.toml"));
}

#[test]
#[serial]
fn test_env_var_selects_config_file() {
    clear_env();
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("from-env.toml");
    fs::write(&path, "[pipeline]\nwindow_length = 15\nchunk_size = 1500\n").unwrap();
    env::set_var(CONFIG_PATH_ENV, &path);

    assert_eq!(resolve_config_path(None), Some(path.clone()));
    let config = TomlConfig::load_or_default(None).unwrap();
    assert_eq!(config.pipeline.window_length, 15);

    clear_env();
}

#[test]
#[serial]
fn test_cli_path_overrides_env_var() {
    clear_env();
    let temp_dir = TempDir::new().unwrap();
    let cli_path = temp_dir.path().join("cli.toml");
    env::set_var(CONFIG_PATH_ENV, temp_dir.path().join("env.toml"));

    assert_eq!(resolve_config_path(Some(&cli_path)), Some(cli_path.clone()));

    clear_env();
}

#[test]
#[serial]
fn test_env_overrides_influx_settings() {
    clear_env();
    let mut config = TomlConfig::from_toml_str(
        r#"
        [influx]
        url = "http://file:8086"
        org = "file-org"
        bucket = "file-bucket"
        token = "file-token"
        "#,
    )
    .unwrap();

    env::set_var("OVIS_INFLUX_URL", "http://env:8086");
    env::set_var("OVIS_INFLUX_TOKEN", "env-token");
    env::set_var("OVIS_INFLUX_ORG", "   ");
    config.apply_env_overrides();

    assert_eq!(config.influx.url, "http://env:8086");
    assert_eq!(config.influx.token.as_deref(), Some("env-token"));
    // Blank values do not override
    assert_eq!(config.influx.org, "file-org");
    assert_eq!(config.influx.bucket, "file-bucket");
    assert!(config.influx.validate().is_ok());

    clear_env();
}

#[test]
fn test_empty_entity_column_disables_tagging() {
    let config = TomlConfig::from_toml_str("[pipeline]\nentity_column = \"\"\n").unwrap();
    assert_eq!(config.pipeline.entity_column(), None);

    let config = TomlConfig::default();
    assert_eq!(config.pipeline.entity_column(), Some("sheep_id"));
}
