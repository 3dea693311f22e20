//! Configuration management
//!
//! Persistent router configuration with:
//! - JSON file-based storage
//! - Validation of thresholds and capacities
//! - Import/export functionality
//! - Thread-safe access

mod storage;
#[cfg(test)]
mod tests;

pub use storage::{
    default_config_path, ConfigError, ConfigResult, ConfigStore, ConfigStoreConfig, RouterConfig,
};
