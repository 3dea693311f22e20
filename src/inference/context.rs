//! Runtime context probes
//!
//! Network and device snapshots consulted on every routing decision.
//! Probes must be cheap and side-effect-free.

use std::collections::VecDeque;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Network link class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionClass {
    Wifi,
    Cellular,
    #[default]
    None,
}

/// Snapshot of network state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkStatus {
    pub is_online: bool,
    pub connection: ConnectionClass,
    pub bandwidth_mbps: f64,
    pub latency_ms: f64,
    /// Derived from recent latency jitter, see [`LatencyWindow`]
    pub is_stable: bool,
}

impl NetworkStatus {
    pub fn offline() -> Self {
        Self {
            is_online: false,
            connection: ConnectionClass::None,
            bandwidth_mbps: 0.0,
            latency_ms: 0.0,
            is_stable: false,
        }
    }

    pub fn wifi_stable() -> Self {
        Self {
            is_online: true,
            connection: ConnectionClass::Wifi,
            bandwidth_mbps: 100.0,
            latency_ms: 20.0,
            is_stable: true,
        }
    }
}

impl Default for NetworkStatus {
    fn default() -> Self {
        Self::offline()
    }
}

/// Device thermal state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ThermalState {
    #[default]
    Normal,
    Fair,
    Serious,
    Critical,
}

/// Snapshot of device capabilities
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceCapabilities {
    pub cpu_cores: u32,
    pub memory_mb: u64,
    pub gpu_available: bool,
    pub battery_percent: f32,
    pub thermal_state: ThermalState,
}

impl Default for DeviceCapabilities {
    fn default() -> Self {
        Self {
            cpu_cores: 4,
            memory_mb: 4096,
            gpu_available: false,
            battery_percent: 100.0,
            thermal_state: ThermalState::Normal,
        }
    }
}

/// Source of network and device snapshots
pub trait ContextProbe: Send + Sync {
    fn current_network_status(&self) -> NetworkStatus;

    fn current_device_capabilities(&self) -> DeviceCapabilities;
}

/// Probe returning injected snapshots
#[derive(Debug, Default)]
pub struct FixedContextProbe {
    network: RwLock<NetworkStatus>,
    device: RwLock<DeviceCapabilities>,
}

impl FixedContextProbe {
    pub fn new(network: NetworkStatus, device: DeviceCapabilities) -> Self {
        Self {
            network: RwLock::new(network),
            device: RwLock::new(device),
        }
    }

    pub fn set_network(&self, network: NetworkStatus) {
        *self.network.write() = network;
    }

    pub fn set_device(&self, device: DeviceCapabilities) {
        *self.device.write() = device;
    }
}

impl ContextProbe for FixedContextProbe {
    fn current_network_status(&self) -> NetworkStatus {
        self.network.read().clone()
    }

    fn current_device_capabilities(&self) -> DeviceCapabilities {
        self.device.read().clone()
    }
}

/// Thresholds for deriving link stability
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StabilityConfig {
    /// Number of most recent latency samples considered
    pub window_size: usize,

    /// Minimum samples before a link can be called stable
    pub min_samples: usize,

    /// Maximum population standard deviation of latency (ms)
    pub max_jitter_ms: f64,
}

impl Default for StabilityConfig {
    fn default() -> Self {
        Self {
            window_size: 10,
            min_samples: 3,
            max_jitter_ms: 50.0,
        }
    }
}

/// Sliding window of round-trip latency samples.
///
/// A link is stable when the window holds at least `min_samples` samples and
/// their population standard deviation does not exceed `max_jitter_ms`.
#[derive(Debug, Clone)]
pub struct LatencyWindow {
    config: StabilityConfig,
    samples: VecDeque<f64>,
}

impl LatencyWindow {
    pub fn new(config: StabilityConfig) -> Self {
        let capacity = config.window_size.max(1);
        Self {
            config,
            samples: VecDeque::with_capacity(capacity),
        }
    }

    /// Push a sample, dropping the oldest beyond the window size.
    /// Non-finite or negative samples are ignored.
    pub fn push(&mut self, latency_ms: f64) {
        if !latency_ms.is_finite() || latency_ms < 0.0 {
            return;
        }
        if self.samples.len() >= self.config.window_size.max(1) {
            self.samples.pop_front();
        }
        self.samples.push_back(latency_ms);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn latest(&self) -> Option<f64> {
        self.samples.back().copied()
    }

    pub fn mean(&self) -> Option<f64> {
        if self.samples.is_empty() {
            return None;
        }
        Some(self.samples.iter().sum::<f64>() / self.samples.len() as f64)
    }

    /// Population standard deviation
    pub fn jitter(&self) -> Option<f64> {
        let mean = self.mean()?;
        let variance = self
            .samples
            .iter()
            .map(|s| (s - mean).powi(2))
            .sum::<f64>()
            / self.samples.len() as f64;
        Some(variance.sqrt())
    }

    pub fn is_stable(&self) -> bool {
        if self.samples.len() < self.config.min_samples.max(1) {
            return false;
        }
        self.jitter()
            .map(|j| j <= self.config.max_jitter_ms)
            .unwrap_or(false)
    }
}

#[derive(Debug)]
struct LinkState {
    is_online: bool,
    connection: ConnectionClass,
    bandwidth_mbps: f64,
    window: LatencyWindow,
}

/// Probe fed by platform reports.
///
/// The platform layer pushes link changes, latency measurements and device
/// snapshots; routing reads the derived state.
#[derive(Debug)]
pub struct MonitoredContextProbe {
    link: RwLock<LinkState>,
    device: RwLock<DeviceCapabilities>,
}

impl MonitoredContextProbe {
    pub fn new(stability: StabilityConfig) -> Self {
        Self {
            link: RwLock::new(LinkState {
                is_online: false,
                connection: ConnectionClass::None,
                bandwidth_mbps: 0.0,
                window: LatencyWindow::new(stability),
            }),
            device: RwLock::new(DeviceCapabilities::default()),
        }
    }

    /// Report link availability and class
    pub fn report_link(&self, is_online: bool, connection: ConnectionClass, bandwidth_mbps: f64) {
        let mut link = self.link.write();
        if link.is_online != is_online {
            tracing::info!(is_online, ?connection, "Network link changed");
        }
        link.is_online = is_online;
        link.connection = connection;
        link.bandwidth_mbps = bandwidth_mbps;
    }

    /// Record a round-trip latency measurement
    pub fn record_latency(&self, latency_ms: f64) {
        self.link.write().window.push(latency_ms);
    }

    /// Report a fresh device snapshot
    pub fn report_device(&self, device: DeviceCapabilities) {
        *self.device.write() = device;
    }
}

impl ContextProbe for MonitoredContextProbe {
    fn current_network_status(&self) -> NetworkStatus {
        let link = self.link.read();
        NetworkStatus {
            is_online: link.is_online,
            connection: link.connection,
            bandwidth_mbps: link.bandwidth_mbps,
            latency_ms: link.window.latest().unwrap_or(0.0),
            is_stable: link.is_online && link.window.is_stable(),
        }
    }

    fn current_device_capabilities(&self) -> DeviceCapabilities {
        self.device.read().clone()
    }
}
