//! Configuration resolution tests
//!
//! Covers the CLI > environment > TOML > default priority order and the
//! graceful handling of missing config files.
//!
//! Note: Uses serial_test crate to prevent ENV variable race conditions.
//! Tests that manipulate HAPTICS_CONFIG or HAPTICS_ASSET_ROOT are marked
//! with #[serial] so they run sequentially.

use haptics_common::config::{
    ConfigOverrides, ConfigResolver, EngineConfig, ASSET_ROOT_ENV_VAR, CONFIG_ENV_VAR,
};
use haptics_common::Error;
use serial_test::serial;
use std::env;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

fn write_config(dir: &TempDir, body: &str) -> PathBuf {
    let path = dir.path().join("config.toml");
    fs::write(&path, body).expect("Failed to write config");
    path
}

fn clear_env() {
    env::remove_var(CONFIG_ENV_VAR);
    env::remove_var(ASSET_ROOT_ENV_VAR);
}

#[test]
#[serial]
fn test_missing_explicit_file_falls_back_to_defaults() {
    clear_env();
    let dir = TempDir::new().unwrap();
    let resolver = ConfigResolver::new(ConfigOverrides {
        config_path: Some(dir.path().join("does-not-exist.toml")),
        ..Default::default()
    });

    let config = resolver.resolve().expect("Missing config must not fail");
    assert_eq!(config, EngineConfig::default());
}

#[test]
#[serial]
fn test_explicit_file_is_loaded() {
    clear_env();
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "coarse_pulse_ms = 120\nsimulated_completion = false\n");

    let resolver = ConfigResolver::new(ConfigOverrides {
        config_path: Some(path),
        ..Default::default()
    });
    let config = resolver.resolve().unwrap();
    assert_eq!(config.coarse_pulse_ms, 120);
    assert!(!config.simulated_completion);
}

#[test]
#[serial]
fn test_env_var_selects_config_file() {
    clear_env();
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "event_capacity = 7\n");
    env::set_var(CONFIG_ENV_VAR, &path);

    let config = ConfigResolver::new(ConfigOverrides::default())
        .resolve()
        .unwrap();
    assert_eq!(config.event_capacity, 7);

    clear_env();
}

#[test]
#[serial]
fn test_malformed_file_is_an_error() {
    clear_env();
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "this is = = not toml");

    let result = ConfigResolver::new(ConfigOverrides {
        config_path: Some(path),
        ..Default::default()
    })
    .resolve();
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
#[serial]
fn test_asset_root_priority() {
    clear_env();
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "asset_root = \"/from/toml\"\n");

    // TOML only
    let config = ConfigResolver::new(ConfigOverrides {
        config_path: Some(path.clone()),
        ..Default::default()
    })
    .resolve()
    .unwrap();
    assert_eq!(config.asset_root, PathBuf::from("/from/toml"));

    // Environment beats TOML
    env::set_var(ASSET_ROOT_ENV_VAR, "/from/env");
    let config = ConfigResolver::new(ConfigOverrides {
        config_path: Some(path.clone()),
        ..Default::default()
    })
    .resolve()
    .unwrap();
    assert_eq!(config.asset_root, PathBuf::from("/from/env"));

    // CLI beats environment
    let config = ConfigResolver::new(ConfigOverrides {
        config_path: Some(path),
        asset_root: Some(PathBuf::from("/from/cli")),
        log_level: Some("trace".to_string()),
    })
    .resolve()
    .unwrap();
    assert_eq!(config.asset_root, PathBuf::from("/from/cli"));
    assert_eq!(config.logging.level, "trace");

    clear_env();
}
