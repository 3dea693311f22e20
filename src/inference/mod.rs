//! Hybrid inference routing core
//!
//! This module decides per request whether inference runs on-device, on the
//! remote service, or on both with result fusion, and carries that out:
//! - Model affinity classification (local- / cloud-capable)
//! - Network and device context probing with link-stability derivation
//! - Ordered routing rules with privacy and offline short-circuits
//! - Single-path, fallback and ensemble execution strategies
//! - Ensemble confidence combination
//! - Bounded per-model latency history
//! - A scheduler façade with timeouts, cancellation and lifecycle events

mod affinity;
mod context;
mod error;
mod executor;
mod merger;
mod policy;
mod scheduler;
mod strategy;
mod tracker;
mod types;


pub use affinity::{AffinityConfig, ModelAffinity, ModelAffinityRegistry};
pub use context::{
    ConnectionClass, ContextProbe, DeviceCapabilities, FixedContextProbe, LatencyWindow,
    MonitoredContextProbe, NetworkStatus, StabilityConfig, ThermalState,
};
pub use error::{ExecutorError, ExecutorResult, InferenceError, InferenceResult};
pub use executor::{ModelExecutor, SimulatedExecutor, SimulationConfig};
pub use merger::{CombinedOutput, EnsembleCombiner, MergerConfig};
pub use policy::{PolicyConfig, RoutingDecision, RoutingPolicy, RoutingStrategy};
pub use scheduler::{
    LifecycleEvent, RequestStage, RoutingStats, Scheduler, SchedulerConfig,
};
pub use strategy::{ConfidenceConfig, StrategyRunner};
pub use tracker::{HistorySnapshot, ModelStats, PerformanceTracker, DEFAULT_HISTORY_CAPACITY};
pub use types::{
    clamp_confidence, Complexity, ExecutorKind, InferenceRequest, InferenceResponse, Metadata,
    Priority, ResultSource,
};
