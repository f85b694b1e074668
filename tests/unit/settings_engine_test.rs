//! Integration-level unit tests for the SettingsEngine public API.
//!
//! Exercises default loading, dot-path updates with persistence, validation of
//! keys and values, and reset.

use std::fs;

use tabkeeper::services::settings_engine::{SettingsEngine, SettingsEngineTrait};
use tabkeeper::types::errors::SettingsError;
use tabkeeper::types::settings::SyncSettings;
use tempfile::TempDir;

/// Helper: create a SettingsEngine backed by a temp directory that lives for the
/// duration of the test (the caller holds the `TempDir` handle).
fn engine_in_temp(dir: &TempDir) -> SettingsEngine {
    let path = dir
        .path()
        .join("settings.json")
        .to_string_lossy()
        .to_string();
    SettingsEngine::new(Some(path))
}

#[test]
fn test_load_defaults_when_no_config_file_exists() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine_in_temp(&dir);

    let settings = engine.load().unwrap();

    assert_eq!(settings, SyncSettings::default());
    assert!(!dir.path().join("settings.json").exists(), "load must not create the file");
}

#[test]
fn test_default_values() {
    let defaults = SyncSettings::default();
    assert_eq!(defaults.history.recent_capacity, 20);
    assert_eq!(defaults.polling.highlight_interval_ms, 1000);
    assert_eq!(defaults.polling.badge_interval_ms, 1500);
    assert!(defaults.placement.enabled);
    assert_eq!(defaults.drag.throttle_ms, 16);
    assert_eq!(defaults.drag.insert_after_threshold, 0.65);
    assert_eq!(defaults.drag.row_tolerance_px, 5.0);
}

#[test]
fn test_set_value_persists_changes() {
    let dir = TempDir::new().unwrap();
    {
        let mut engine = engine_in_temp(&dir);
        engine.load().unwrap();
        engine
            .set_value("history.recent_capacity", serde_json::json!(5))
            .unwrap();
        engine
            .set_value("placement.enabled", serde_json::json!(false))
            .unwrap();
    }

    let mut reopened = engine_in_temp(&dir);
    let loaded = reopened.load().unwrap();
    assert_eq!(loaded.history.recent_capacity, 5);
    assert!(!loaded.placement.enabled);
    assert_eq!(loaded.drag, SyncSettings::default().drag);
}

#[test]
fn test_threshold_is_tunable() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine_in_temp(&dir);
    engine.load().unwrap();

    engine
        .set_value("drag.insert_after_threshold", serde_json::json!(0.5))
        .unwrap();
    assert_eq!(engine.get_settings().drag.insert_after_threshold, 0.5);
}

#[test]
fn test_unknown_and_empty_keys_are_rejected() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine_in_temp(&dir);
    engine.load().unwrap();

    assert!(matches!(
        engine.set_value("drag.speed", serde_json::json!(1)),
        Err(SettingsError::InvalidKey(_))
    ));
    assert!(matches!(
        engine.set_value("nonexistent.key", serde_json::json!(1)),
        Err(SettingsError::InvalidKey(_))
    ));
    assert!(matches!(
        engine.set_value("", serde_json::json!(1)),
        Err(SettingsError::InvalidKey(_))
    ));
}

#[test]
fn test_wrong_value_type_is_rejected_and_settings_unchanged() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine_in_temp(&dir);
    engine.load().unwrap();

    let result = engine.set_value("polling.badge_interval_ms", serde_json::json!("fast"));
    assert!(matches!(result, Err(SettingsError::InvalidValue(_))));
    assert_eq!(*engine.get_settings(), SyncSettings::default());
}

#[test]
fn test_reset_restores_defaults() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine_in_temp(&dir);
    engine.load().unwrap();
    engine
        .set_value("polling.highlight_interval_ms", serde_json::json!(250))
        .unwrap();

    engine.reset().unwrap();
    assert_eq!(*engine.get_settings(), SyncSettings::default());

    let mut reopened = engine_in_temp(&dir);
    assert_eq!(reopened.load().unwrap(), SyncSettings::default());
}

#[test]
fn test_malformed_file_is_a_serialization_error() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("settings.json"), "{ not json").unwrap();

    let mut engine = engine_in_temp(&dir);
    assert!(matches!(engine.load(), Err(SettingsError::SerializationError(_))));
}

#[test]
fn test_save_creates_missing_parent_directories() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("deeper").join("settings.json");
    let engine = SettingsEngine::new(Some(path.to_string_lossy().to_string()));

    engine.save().unwrap();
    assert!(path.exists());
}
