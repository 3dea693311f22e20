//! Model affinity registry
//!
//! Classifies model ids as local-capable, cloud-capable, both or neither.
//! Sets are loaded once at startup; `replace` swaps both under one write lock.

use std::collections::HashSet;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use super::error::{InferenceError, InferenceResult};

/// Static affinity configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AffinityConfig {
    /// Models that can run on-device
    #[serde(default)]
    pub local_models: Vec<String>,

    /// Models that can run on the remote service
    #[serde(default)]
    pub cloud_models: Vec<String>,
}

impl AffinityConfig {
    /// Preset covering the health-assistant model family
    pub fn health_assistant() -> Self {
        Self {
            local_models: vec![
                "symptom_screening".to_string(),
                "vital_signs_analysis".to_string(),
                "voice_command".to_string(),
                "image_preprocess".to_string(),
            ],
            cloud_models: vec![
                "symptom_screening".to_string(),
                "constitution_analysis".to_string(),
                "syndrome_differentiation".to_string(),
                "treatment_recommendation".to_string(),
                "medical_report".to_string(),
            ],
        }
    }
}

/// Where a model may run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelAffinity {
    LocalOnly,
    CloudOnly,
    Both,
    Unknown,
}

#[derive(Debug, Default)]
struct AffinitySets {
    local: HashSet<String>,
    cloud: HashSet<String>,
}

/// Registry of local- and cloud-capable models
#[derive(Debug, Default)]
pub struct ModelAffinityRegistry {
    sets: RwLock<AffinitySets>,
}

impl ModelAffinityRegistry {
    /// Create a registry from explicit model lists
    pub fn new<L, C>(local: L, cloud: C) -> Self
    where
        L: IntoIterator,
        L::Item: Into<String>,
        C: IntoIterator,
        C::Item: Into<String>,
    {
        Self {
            sets: RwLock::new(AffinitySets {
                local: local.into_iter().map(Into::into).collect(),
                cloud: cloud.into_iter().map(Into::into).collect(),
            }),
        }
    }

    /// Create a registry from configuration
    pub fn from_config(config: &AffinityConfig) -> Self {
        Self::new(config.local_models.iter().cloned(), config.cloud_models.iter().cloned())
    }

    pub fn is_local_capable(&self, model_id: &str) -> bool {
        self.sets.read().local.contains(model_id)
    }

    pub fn is_cloud_capable(&self, model_id: &str) -> bool {
        self.sets.read().cloud.contains(model_id)
    }

    /// Classify a model id
    pub fn classify(&self, model_id: &str) -> ModelAffinity {
        let sets = self.sets.read();
        match (sets.local.contains(model_id), sets.cloud.contains(model_id)) {
            (true, true) => ModelAffinity::Both,
            (true, false) => ModelAffinity::LocalOnly,
            (false, true) => ModelAffinity::CloudOnly,
            (false, false) => ModelAffinity::Unknown,
        }
    }

    /// Fail with a configuration error for models in neither set
    pub fn ensure_known(&self, model_id: &str) -> InferenceResult<ModelAffinity> {
        match self.classify(model_id) {
            ModelAffinity::Unknown => Err(InferenceError::Configuration {
                model_id: model_id.to_string(),
            }),
            affinity => Ok(affinity),
        }
    }

    /// Replace both sets atomically (hot reload)
    pub fn replace(&self, config: &AffinityConfig) {
        let next = AffinitySets {
            local: config.local_models.iter().cloned().collect(),
            cloud: config.cloud_models.iter().cloned().collect(),
        };
        let mut sets = self.sets.write();
        *sets = next;
        tracing::info!(
            local = sets.local.len(),
            cloud = sets.cloud.len(),
            "Model affinity sets replaced"
        );
    }

    /// Number of distinct registered models
    pub fn model_count(&self) -> usize {
        let sets = self.sets.read();
        sets.local.union(&sets.cloud).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        let registry = ModelAffinityRegistry::new(["a", "both"], ["b", "both"]);
        assert_eq!(registry.classify("a"), ModelAffinity::LocalOnly);
        assert_eq!(registry.classify("b"), ModelAffinity::CloudOnly);
        assert_eq!(registry.classify("both"), ModelAffinity::Both);
        assert_eq!(registry.classify("zzz"), ModelAffinity::Unknown);
        assert_eq!(registry.model_count(), 3);
    }

    #[test]
    fn test_unknown_model_is_configuration_error() {
        let registry = ModelAffinityRegistry::new(["a"], Vec::<String>::new());
        let err = registry.ensure_known("missing").unwrap_err();
        assert_eq!(err.kind(), "configuration");
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_replace_swaps_both_sets() {
        let registry = ModelAffinityRegistry::from_config(&AffinityConfig::health_assistant());
        assert!(registry.is_local_capable("symptom_screening"));

        registry.replace(&AffinityConfig {
            local_models: vec!["new_local".to_string()],
            cloud_models: vec![],
        });

        assert!(!registry.is_local_capable("symptom_screening"));
        assert!(!registry.is_cloud_capable("symptom_screening"));
        assert!(registry.is_local_capable("new_local"));
    }
}
