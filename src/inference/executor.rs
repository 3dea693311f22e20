//! Model-execution collaborators
//!
//! The routing core never runs a model itself. On-device runtimes and remote
//! RPC clients implement [`ModelExecutor`] and are injected into the scheduler.

use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

use super::error::{ExecutorError, ExecutorResult};
use super::types::ExecutorKind;

/// Runs a model on some execution target.
///
/// `cancel` is advisory: it fires when the owning request times out or is
/// dropped. Implementations should stop work promptly when it does, but the
/// scheduler never waits for them to honour it.
#[async_trait]
pub trait ModelExecutor<I, O>: Send + Sync
where
    I: Send + Sync + 'static,
    O: Send + 'static,
{
    async fn run(&self, model_id: &str, input: &I, cancel: &CancellationToken)
        -> ExecutorResult<O>;
}

/// Settings for [`SimulatedExecutor`]
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    /// Base latency per call
    pub base_latency: Duration,
    /// Uniform random jitter added on top of the base latency
    pub jitter: Duration,
    /// Probability in [0, 1] that a call fails
    pub failure_rate: f64,
}

impl SimulationConfig {
    pub fn local() -> Self {
        Self {
            base_latency: Duration::from_millis(50),
            jitter: Duration::from_millis(20),
            failure_rate: 0.05,
        }
    }

    pub fn cloud() -> Self {
        Self {
            base_latency: Duration::from_millis(150),
            jitter: Duration::from_millis(100),
            failure_rate: 0.1,
        }
    }
}

/// Stand-in executor producing tagged placeholder outputs after a delay
#[derive(Debug, Clone)]
pub struct SimulatedExecutor {
    kind: ExecutorKind,
    config: SimulationConfig,
}

impl SimulatedExecutor {
    pub fn new(kind: ExecutorKind, config: SimulationConfig) -> Self {
        Self { kind, config }
    }

    pub fn local() -> Self {
        Self::new(ExecutorKind::Local, SimulationConfig::local())
    }

    pub fn cloud() -> Self {
        Self::new(ExecutorKind::Cloud, SimulationConfig::cloud())
    }

    fn sample(&self) -> (Duration, bool) {
        let mut rng = rand::thread_rng();
        let jitter_ms = self.config.jitter.as_millis() as u64;
        let extra = if jitter_ms > 0 {
            rng.gen_range(0..=jitter_ms)
        } else {
            0
        };
        let failure_rate = if self.config.failure_rate.is_finite() {
            self.config.failure_rate.clamp(0.0, 1.0)
        } else {
            0.0
        };
        let fails = rng.gen_bool(failure_rate);
        (self.config.base_latency + Duration::from_millis(extra), fails)
    }
}

#[async_trait]
impl ModelExecutor<Value, Value> for SimulatedExecutor {
    async fn run(&self, model_id: &str, input: &Value, cancel: &CancellationToken) -> ExecutorResult<Value> {
        let (delay, fails) = self.sample();

        tokio::select! {
            _ = cancel.cancelled() => return Err(ExecutorError::Cancelled),
            _ = tokio::time::sleep(delay) => {}
        }

        if fails {
            return Err(match self.kind {
                ExecutorKind::Local => ExecutorError::ModelFailed {
                    reason: format!("simulated local runtime fault for {}", model_id),
                },
                ExecutorKind::Cloud => ExecutorError::Network {
                    reason: format!("simulated remote call failure for {}", model_id),
                },
            });
        }

        Ok(json!({
            "model": model_id,
            "executor": self.kind.to_string(),
            "result": format!("{}_{}_result", self.kind, model_id),
            "input_size": input.to_string().len(),
            "latency_ms": delay.as_millis() as u64,
        }))
    }
}
