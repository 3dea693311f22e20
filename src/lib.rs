//! Hybrid inference routing core
//!
//! Decides, per request, whether a model invocation runs on-device, on a
//! remote service, or on both with result fusion:
//! - Model affinity classification and ordered routing rules
//! - Fallback and hybrid-ensemble execution with timeouts and cancellation
//! - Bounded per-model latency history and routing statistics
//! - JSON configuration storage and structured logging

pub mod config;
pub mod inference;
pub mod logging;

// Re-export commonly used items
pub use config::{ConfigError, ConfigResult, ConfigStore, ConfigStoreConfig, RouterConfig};
pub use inference::{
    ContextProbe, DeviceCapabilities, InferenceError, InferenceRequest, InferenceResponse,
    InferenceResult, ModelAffinityRegistry, ModelExecutor, NetworkStatus, RoutingStrategy,
    Scheduler, SchedulerConfig,
};
pub use logging::{LoggingConfig, LoggingSystem};
