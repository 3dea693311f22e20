//! Configuration Storage Implementation
//!
//! Provides JSON file-based configuration storage with:
//! - Atomic writes using temp file + rename
//! - Validation on every load and write
//! - Thread-safe access via RwLock
//! - Default configuration generation

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::inference::{AffinityConfig, SchedulerConfig, StabilityConfig};
use crate::logging::LoggingConfig;

/// Configuration error types
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Configuration result type
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Configuration store settings
#[derive(Debug, Clone)]
pub struct ConfigStoreConfig {
    /// Path to the configuration file
    pub config_path: PathBuf,
    /// Whether to create default config if not exists
    pub create_default: bool,
}

impl Default for ConfigStoreConfig {
    fn default() -> Self {
        Self {
            config_path: default_config_path(),
            create_default: true,
        }
    }
}

impl ConfigStoreConfig {
    pub fn at(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
            create_default: true,
        }
    }
}

/// Platform config location, e.g. `~/.config/hybrid-inference/router.json`
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("hybrid-inference")
        .join("router.json")
}

/// Router configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterConfig {
    #[serde(default = "default_version")]
    pub version: u32,

    /// Local- and cloud-capable model ids
    #[serde(default = "AffinityConfig::health_assistant")]
    pub affinity: AffinityConfig,

    /// Link stability thresholds
    #[serde(default)]
    pub stability: StabilityConfig,

    /// Timeouts, history, confidence and routing thresholds
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    /// Last modified timestamp
    #[serde(default = "default_timestamp")]
    pub last_modified: String,
}

fn default_version() -> u32 {
    1
}

fn default_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            affinity: AffinityConfig::health_assistant(),
            stability: StabilityConfig::default(),
            scheduler: SchedulerConfig::default(),
            logging: LoggingConfig::default(),
            last_modified: default_timestamp(),
        }
    }
}

impl RouterConfig {
    /// Reject values the router cannot operate with
    pub fn validate(&self) -> ConfigResult<()> {
        let affinity = &self.affinity;
        if affinity.local_models.is_empty() && affinity.cloud_models.is_empty() {
            return invalid("affinity must list at least one model");
        }
        if let Some(id) = affinity
            .local_models
            .iter()
            .chain(affinity.cloud_models.iter())
            .find(|id| id.trim().is_empty())
        {
            return invalid(format!("affinity contains a blank model id {:?}", id));
        }

        let stability = &self.stability;
        if stability.window_size == 0 {
            return invalid("stability.window_size must be positive");
        }
        if stability.min_samples == 0 || stability.min_samples > stability.window_size {
            return invalid(format!(
                "stability.min_samples must be in 1..={}",
                stability.window_size
            ));
        }
        if !stability.max_jitter_ms.is_finite() || stability.max_jitter_ms < 0.0 {
            return invalid("stability.max_jitter_ms must be a non-negative number");
        }

        let scheduler = &self.scheduler;
        if scheduler.default_timeout_ms == 0 {
            return invalid("scheduler.default_timeout_ms must be positive");
        }
        if scheduler.history_capacity == 0 {
            return invalid("scheduler.history_capacity must be positive");
        }
        if scheduler.event_channel_capacity == 0 {
            return invalid("scheduler.event_channel_capacity must be positive");
        }
        for (name, value) in [
            ("local_baseline", scheduler.confidence.local_baseline),
            ("cloud_baseline", scheduler.confidence.cloud_baseline),
            ("confidence_cap", scheduler.merger.confidence_cap),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return invalid(format!("{} must be within [0, 1], got {}", name, value));
            }
        }
        if !scheduler.merger.boost_factor.is_finite() || scheduler.merger.boost_factor <= 0.0 {
            return invalid("merger.boost_factor must be a positive number");
        }
        if !(0.0..=100.0).contains(&scheduler.policy.low_battery_percent) {
            return invalid("policy.low_battery_percent must be within [0, 100]");
        }

        Ok(())
    }
}

fn invalid(message: impl Into<String>) -> ConfigResult<()> {
    Err(ConfigError::Invalid(message.into()))
}

/// Configuration store with thread-safe access
pub struct ConfigStore {
    config: Arc<RwLock<RouterConfig>>,
    settings: ConfigStoreConfig,
}

impl ConfigStore {
    /// Open the store, creating a default file when allowed
    pub async fn new(settings: ConfigStoreConfig) -> ConfigResult<Self> {
        if let Some(parent) = settings.config_path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let config = if tokio::fs::try_exists(&settings.config_path).await? {
            Self::load_from_file(&settings.config_path).await?
        } else if settings.create_default {
            let default_config = RouterConfig::default();
            Self::save_to_file(&settings.config_path, &default_config).await?;
            tracing::info!(path = ?settings.config_path, "Created default router configuration");
            default_config
        } else {
            return Err(ConfigError::NotFound(settings.config_path.clone()));
        };

        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            settings,
        })
    }

    /// Load and validate configuration from file
    pub async fn load_from_file(path: &Path) -> ConfigResult<RouterConfig> {
        let content = tokio::fs::read_to_string(path).await?;
        let config: RouterConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file with atomic write
    async fn save_to_file(path: &Path, config: &RouterConfig) -> ConfigResult<()> {
        let content = serde_json::to_string_pretty(config)?;

        let temp_path = path.with_extension("json.tmp");
        tokio::fs::write(&temp_path, &content).await?;
        tokio::fs::rename(&temp_path, path).await?;

        Ok(())
    }

    /// Get current configuration (read-only)
    pub async fn get(&self) -> RouterConfig {
        self.config.read().await.clone()
    }

    /// Apply an update; nothing changes if the result fails validation
    pub async fn update<F>(&self, updater: F) -> ConfigResult<RouterConfig>
    where
        F: FnOnce(&mut RouterConfig),
    {
        let mut config = self.config.write().await;

        let mut candidate = config.clone();
        updater(&mut candidate);
        candidate.validate()?;
        candidate.last_modified = chrono::Utc::now().to_rfc3339();

        Self::save_to_file(&self.settings.config_path, &candidate).await?;
        *config = candidate;

        Ok(config.clone())
    }

    /// Replace the entire configuration
    pub async fn set(&self, new_config: RouterConfig) -> ConfigResult<()> {
        self.update(|config| *config = new_config).await.map(|_| ())
    }

    /// Export configuration to a file
    pub async fn export(&self, path: &Path) -> ConfigResult<()> {
        let config = self.config.read().await;
        Self::save_to_file(path, &config).await
    }

    /// Import configuration from a file
    pub async fn import(&self, path: &Path) -> ConfigResult<RouterConfig> {
        let imported = Self::load_from_file(path).await?;
        self.set(imported.clone()).await?;
        Ok(imported)
    }

    /// Reset to default configuration
    pub async fn reset(&self) -> ConfigResult<RouterConfig> {
        let default_config = RouterConfig::default();
        self.set(default_config.clone()).await?;
        Ok(default_config)
    }

    /// Get configuration file path
    pub fn config_path(&self) -> &Path {
        &self.settings.config_path
    }
}

// Convenience methods for specific config sections
impl ConfigStore {
    /// Replace the affinity sets
    pub async fn set_affinity(&self, affinity: AffinityConfig) -> ConfigResult<RouterConfig> {
        self.update(|config| {
            config.affinity = affinity;
        })
        .await
    }

    /// Change the deadline applied to requests without their own timeout
    pub async fn set_default_timeout_ms(&self, timeout_ms: u64) -> ConfigResult<RouterConfig> {
        self.update(|config| {
            config.scheduler.default_timeout_ms = timeout_ms;
        })
        .await
    }
}
