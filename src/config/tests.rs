//! Tests for Configuration Module

use super::*;
use crate::inference::AffinityConfig;
use tempfile::TempDir;

/// Create a test config store with temporary directory
async fn create_test_store() -> (ConfigStore, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let settings = ConfigStoreConfig::at(temp_dir.path().join("router.json"));
    let store = ConfigStore::new(settings).await.unwrap();
    (store, temp_dir)
}

#[test]
fn test_default_config_is_valid() {
    let config = RouterConfig::default();
    assert!(config.validate().is_ok());
    assert_eq!(config.version, 1);
    assert_eq!(config.scheduler.default_timeout_ms, 30_000);
    assert_eq!(config.scheduler.history_capacity, 100);
    assert_eq!(config.stability.window_size, 10);
    assert!(config
        .affinity
        .local_models
        .iter()
        .any(|m| m == "symptom_screening"));
}

#[test]
fn test_partial_json_uses_defaults() {
    let config: RouterConfig =
        serde_json::from_str(r#"{"scheduler": {"default_timeout_ms": 5000}}"#).unwrap();
    assert_eq!(config.scheduler.default_timeout_ms, 5000);
    assert_eq!(config.scheduler.history_capacity, 100);
    assert_eq!(config.scheduler.confidence.local_baseline, 0.85);
    assert_eq!(config.scheduler.merger.confidence_cap, 0.95);
    assert!(!config.affinity.cloud_models.is_empty());
}

#[test]
fn test_validate_rejects_bad_values() {
    let mut config = RouterConfig::default();
    config.scheduler.default_timeout_ms = 0;
    assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

    let mut config = RouterConfig::default();
    config.stability.min_samples = 20;
    assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

    let mut config = RouterConfig::default();
    config.scheduler.merger.confidence_cap = 1.5;
    assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

    let mut config = RouterConfig::default();
    config.scheduler.confidence.cloud_baseline = f32::NAN;
    assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

    let mut config = RouterConfig::default();
    config.affinity = AffinityConfig::default();
    assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

    let mut config = RouterConfig::default();
    config.affinity.local_models.push("  ".to_string());
    assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
}

#[tokio::test]
async fn test_create_default_config() {
    let (store, _temp) = create_test_store().await;

    assert!(store.config_path().exists());
    let config = store.get().await;
    assert_eq!(config.scheduler.default_timeout_ms, 30_000);
}

#[tokio::test]
async fn test_missing_file_without_default() {
    let temp_dir = TempDir::new().unwrap();
    let settings = ConfigStoreConfig {
        config_path: temp_dir.path().join("absent.json"),
        create_default: false,
    };

    let result = ConfigStore::new(settings).await;
    assert!(matches!(result, Err(ConfigError::NotFound(_))));
}

#[tokio::test]
async fn test_update_persists() {
    let (store, temp) = create_test_store().await;

    let updated = store.set_default_timeout_ms(1_500).await.unwrap();
    assert_eq!(updated.scheduler.default_timeout_ms, 1_500);

    // A fresh store sees the write
    let reopened = ConfigStore::new(ConfigStoreConfig::at(temp.path().join("router.json")))
        .await
        .unwrap();
    assert_eq!(reopened.get().await.scheduler.default_timeout_ms, 1_500);
    assert!(!temp.path().join("router.json.tmp").exists());
}

#[tokio::test]
async fn test_invalid_update_is_rejected() {
    let (store, _temp) = create_test_store().await;

    let result = store.set_default_timeout_ms(0).await;
    assert!(matches!(result, Err(ConfigError::Invalid(_))));
    assert_eq!(store.get().await.scheduler.default_timeout_ms, 30_000);
}

#[tokio::test]
async fn test_set_affinity() {
    let (store, _temp) = create_test_store().await;

    let affinity = AffinityConfig {
        local_models: vec!["triage".to_string()],
        cloud_models: vec!["triage".to_string(), "summary".to_string()],
    };
    let updated = store.set_affinity(affinity).await.unwrap();
    assert_eq!(updated.affinity.cloud_models.len(), 2);
}

#[tokio::test]
async fn test_export_import() {
    let (store, temp) = create_test_store().await;

    store.set_default_timeout_ms(2_000).await.unwrap();
    let export_path = temp.path().join("export.json");
    store.export(&export_path).await.unwrap();

    store.reset().await.unwrap();
    assert_eq!(store.get().await.scheduler.default_timeout_ms, 30_000);

    let imported = store.import(&export_path).await.unwrap();
    assert_eq!(imported.scheduler.default_timeout_ms, 2_000);
    assert_eq!(store.get().await.scheduler.default_timeout_ms, 2_000);
}

#[tokio::test]
async fn test_load_rejects_invalid_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("router.json");
    tokio::fs::write(&path, r#"{"scheduler": {"history_capacity": 0}}"#)
        .await
        .unwrap();

    let result = ConfigStore::new(ConfigStoreConfig::at(&path)).await;
    assert!(matches!(result, Err(ConfigError::Invalid(_))));
}

#[tokio::test]
async fn test_load_rejects_malformed_json() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("router.json");
    tokio::fs::write(&path, "{ not json").await.unwrap();

    let result = ConfigStore::new(ConfigStoreConfig::at(&path)).await;
    assert!(matches!(result, Err(ConfigError::Json(_))));
}
