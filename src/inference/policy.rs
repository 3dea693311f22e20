//! Routing policy
//!
//! Pure decision function mapping a request plus context snapshots to an
//! execution strategy. Rules are evaluated in order and the first match wins;
//! the order is part of the contract.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::affinity::ModelAffinityRegistry;
use super::context::{DeviceCapabilities, NetworkStatus, ThermalState};
use super::types::{Complexity, InferenceRequest, Priority};

/// Execution strategy chosen for a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutingStrategy {
    LocalOnly,
    CloudOnly,
    LocalWithCloudFallback,
    CloudWithLocalFallback,
    HybridEnsemble,
}

impl RoutingStrategy {
    pub const ALL: [RoutingStrategy; 5] = [
        RoutingStrategy::LocalOnly,
        RoutingStrategy::CloudOnly,
        RoutingStrategy::LocalWithCloudFallback,
        RoutingStrategy::CloudWithLocalFallback,
        RoutingStrategy::HybridEnsemble,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RoutingStrategy::LocalOnly => "local_only",
            RoutingStrategy::CloudOnly => "cloud_only",
            RoutingStrategy::LocalWithCloudFallback => "local_with_cloud_fallback",
            RoutingStrategy::CloudWithLocalFallback => "cloud_with_local_fallback",
            RoutingStrategy::HybridEnsemble => "hybrid_ensemble",
        }
    }

    pub(crate) fn index(self) -> usize {
        match self {
            RoutingStrategy::LocalOnly => 0,
            RoutingStrategy::CloudOnly => 1,
            RoutingStrategy::LocalWithCloudFallback => 2,
            RoutingStrategy::CloudWithLocalFallback => 3,
            RoutingStrategy::HybridEnsemble => 4,
        }
    }
}

impl fmt::Display for RoutingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Strategy plus a human-readable reason
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingDecision {
    pub strategy: RoutingStrategy,
    pub reasoning: String,
}

impl RoutingDecision {
    fn new(strategy: RoutingStrategy, reasoning: &str) -> Self {
        Self {
            strategy,
            reasoning: reasoning.to_string(),
        }
    }
}

/// Policy thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Battery level (percent) below which the device counts as constrained
    pub low_battery_percent: f32,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            low_battery_percent: 20.0,
        }
    }
}

/// Ordered rule chain over request and context
#[derive(Debug, Clone)]
pub struct RoutingPolicy {
    affinity: Arc<ModelAffinityRegistry>,
    config: PolicyConfig,
}

impl RoutingPolicy {
    pub fn new(affinity: Arc<ModelAffinityRegistry>) -> Self {
        Self::with_config(affinity, PolicyConfig::default())
    }

    pub fn with_config(affinity: Arc<ModelAffinityRegistry>, config: PolicyConfig) -> Self {
        Self { affinity, config }
    }

    /// Decide how to execute a request
    pub fn decide<I>(
        &self,
        request: &InferenceRequest<I>,
        network: &NetworkStatus,
        device: &DeviceCapabilities,
    ) -> RoutingDecision {
        if request.requires_privacy {
            return RoutingDecision::new(RoutingStrategy::LocalOnly, "privacy constraint");
        }

        if !network.is_online {
            return RoutingDecision::new(RoutingStrategy::LocalOnly, "network unavailable");
        }

        if request.complexity == Complexity::Simple
            && self.affinity.is_local_capable(&request.model_id)
        {
            return RoutingDecision::new(
                RoutingStrategy::LocalWithCloudFallback,
                "simple request on local-capable model",
            );
        }

        if request.complexity == Complexity::Complex && network.is_stable {
            return RoutingDecision::new(
                RoutingStrategy::CloudWithLocalFallback,
                "complex request on stable network",
            );
        }

        if device.battery_percent < self.config.low_battery_percent
            || device.thermal_state == ThermalState::Critical
        {
            return RoutingDecision::new(RoutingStrategy::CloudOnly, "device constrained");
        }

        if request.priority == Priority::Critical {
            return RoutingDecision::new(
                RoutingStrategy::HybridEnsemble,
                "critical priority, ensemble for quality",
            );
        }

        RoutingDecision::new(RoutingStrategy::LocalWithCloudFallback, "default routing")
    }
}
