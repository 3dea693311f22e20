//! Execution strategies
//!
//! Carries out a routing decision against the local and cloud executors:
//! - Single-path execution with a fixed confidence baseline per executor
//! - Fallback execution that swallows the first failure
//! - Hybrid ensemble that waits for both paths to settle
//!
//! Every executor call runs as its own spawned task observing the request's
//! cancellation token, so a panicking executor settles as a failure instead
//! of tearing down the caller.

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::error::{ExecutorError, ExecutorResult, InferenceError, InferenceResult};
use super::executor::ModelExecutor;
use super::merger::{EnsembleCombiner, MergerConfig};
use super::policy::RoutingStrategy;
use super::types::{ExecutorKind, InferenceRequest, InferenceResponse, ResultSource};

/// Confidence reported for single-path results.
///
/// These are deployment policy constants, not model outputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceConfig {
    pub local_baseline: f32,
    pub cloud_baseline: f32,
}

impl Default for ConfidenceConfig {
    fn default() -> Self {
        Self {
            local_baseline: 0.85,
            cloud_baseline: 0.92,
        }
    }
}

impl ConfidenceConfig {
    pub fn baseline(&self, kind: ExecutorKind) -> f32 {
        match kind {
            ExecutorKind::Local => self.local_baseline,
            ExecutorKind::Cloud => self.cloud_baseline,
        }
    }
}

/// Executor output with the time the call took
struct TimedOutput<O> {
    output: O,
    elapsed_ms: u64,
}

/// Runs strategies against the injected executors
pub struct StrategyRunner<I, O> {
    local: Arc<dyn ModelExecutor<I, O>>,
    cloud: Arc<dyn ModelExecutor<I, O>>,
    confidence: ConfidenceConfig,
    combiner: EnsembleCombiner,
}

impl<I, O> StrategyRunner<I, O>
where
    I: Send + Sync + 'static,
    O: Send + 'static,
{
    pub fn new(local: Arc<dyn ModelExecutor<I, O>>, cloud: Arc<dyn ModelExecutor<I, O>>) -> Self {
        Self {
            local,
            cloud,
            confidence: ConfidenceConfig::default(),
            combiner: EnsembleCombiner::new(),
        }
    }

    pub fn with_confidence(mut self, confidence: ConfidenceConfig) -> Self {
        self.confidence = confidence;
        self
    }

    pub fn with_merger_config(mut self, config: MergerConfig) -> Self {
        self.combiner = EnsembleCombiner::with_config(config);
        self
    }

    /// Execute `strategy` for `request`
    pub async fn execute(
        &self,
        strategy: RoutingStrategy,
        request: &Arc<InferenceRequest<I>>,
        cancel: &CancellationToken,
    ) -> InferenceResult<InferenceResponse<O>> {
        match strategy {
            RoutingStrategy::LocalOnly => self.single(ExecutorKind::Local, request, cancel).await,
            RoutingStrategy::CloudOnly => self.single(ExecutorKind::Cloud, request, cancel).await,
            RoutingStrategy::LocalWithCloudFallback => {
                self.with_fallback(ExecutorKind::Local, ExecutorKind::Cloud, request, cancel)
                    .await
            }
            RoutingStrategy::CloudWithLocalFallback => {
                self.with_fallback(ExecutorKind::Cloud, ExecutorKind::Local, request, cancel)
                    .await
            }
            RoutingStrategy::HybridEnsemble => self.ensemble(request, cancel).await,
        }
    }

    async fn single(
        &self,
        kind: ExecutorKind,
        request: &Arc<InferenceRequest<I>>,
        cancel: &CancellationToken,
    ) -> InferenceResult<InferenceResponse<O>> {
        let handle = self.spawn_call(kind, request, cancel);
        let timed = settle(handle)
            .await
            .map_err(|e| InferenceError::executor(kind, e))?;
        Ok(self.wrap(kind, request, timed))
    }

    async fn with_fallback(
        &self,
        primary: ExecutorKind,
        secondary: ExecutorKind,
        request: &Arc<InferenceRequest<I>>,
        cancel: &CancellationToken,
    ) -> InferenceResult<InferenceResponse<O>> {
        let start = Instant::now();
        let first_error = match self.single(primary, request, cancel).await {
            Ok(response) => return Ok(response),
            Err(e) => e,
        };

        tracing::warn!(
            request_id = %request.id,
            model_id = %request.model_id,
            failed = %primary,
            fallback = %secondary,
            error = %first_error,
            "Primary executor failed, falling back"
        );

        let mut response = self.single(secondary, request, cancel).await?;
        response.processing_time_ms = start.elapsed().as_millis() as u64;
        Ok(response
            .with_metadata("fallback_used", json!(true))
            .with_metadata("primary_error", json!(first_error.to_string())))
    }

    async fn ensemble(
        &self,
        request: &Arc<InferenceRequest<I>>,
        cancel: &CancellationToken,
    ) -> InferenceResult<InferenceResponse<O>> {
        let start = Instant::now();

        // Both launched before either is awaited
        let local = self.spawn_call(ExecutorKind::Local, request, cancel);
        let cloud = self.spawn_call(ExecutorKind::Cloud, request, cancel);
        let (local, cloud) = tokio::join!(settle(local), settle(cloud));

        match (local, cloud) {
            (Err(local_err), Err(cloud_err)) => Err(InferenceError::EnsembleExhausted {
                local: local_err.to_string(),
                cloud: cloud_err.to_string(),
            }),
            (Ok(timed), Err(cloud_err)) => {
                tracing::warn!(request_id = %request.id, error = %cloud_err, "Ensemble cloud path failed");
                Ok(self.partial_ensemble(ExecutorKind::Local, request, timed, cloud_err))
            }
            (Err(local_err), Ok(timed)) => {
                tracing::warn!(request_id = %request.id, error = %local_err, "Ensemble local path failed");
                Ok(self.partial_ensemble(ExecutorKind::Cloud, request, timed, local_err))
            }
            (Ok(local), Ok(cloud)) => {
                let results = vec![
                    self.wrap(ExecutorKind::Local, request, local),
                    self.wrap(ExecutorKind::Cloud, request, cloud),
                ];
                let combined = self.combiner.combine(results).ok_or_else(|| {
                    InferenceError::EnsembleExhausted {
                        local: "no result".to_string(),
                        cloud: "no result".to_string(),
                    }
                })?;

                let winner = combined.winner.metadata.get("executor").cloned();
                let mut response = combined.winner;
                response.source = ResultSource::Hybrid;
                response.processing_time_ms = start.elapsed().as_millis() as u64;
                Ok(response
                    .with_metadata("ensemble_size", json!(combined.ensemble_size))
                    .with_metadata("winner", winner.unwrap_or(serde_json::Value::Null)))
            }
        }
    }

    /// One ensemble path succeeded: its result verbatim, tagged hybrid
    fn partial_ensemble(
        &self,
        kind: ExecutorKind,
        request: &InferenceRequest<I>,
        timed: TimedOutput<O>,
        other_error: ExecutorError,
    ) -> InferenceResponse<O> {
        let mut response = self.wrap(kind, request, timed);
        response.source = ResultSource::Hybrid;
        response
            .with_metadata("ensemble_size", json!(1))
            .with_metadata("failed_path_error", json!(other_error.to_string()))
    }

    fn spawn_call(
        &self,
        kind: ExecutorKind,
        request: &Arc<InferenceRequest<I>>,
        cancel: &CancellationToken,
    ) -> JoinHandle<ExecutorResult<TimedOutput<O>>> {
        let executor = match kind {
            ExecutorKind::Local => Arc::clone(&self.local),
            ExecutorKind::Cloud => Arc::clone(&self.cloud),
        };
        let request = Arc::clone(request);
        let cancel = cancel.clone();

        tokio::spawn(async move {
            let start = Instant::now();
            let result: ExecutorResult<O> = tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(ExecutorError::Cancelled),
                result = executor.run(&request.model_id, &request.input_data, &cancel) => result,
            };
            result.map(|output| TimedOutput {
                output,
                elapsed_ms: start.elapsed().as_millis() as u64,
            })
        })
    }

    fn wrap(
        &self,
        kind: ExecutorKind,
        request: &InferenceRequest<I>,
        timed: TimedOutput<O>,
    ) -> InferenceResponse<O> {
        InferenceResponse::new(
            request.id.clone(),
            timed.output,
            self.confidence.baseline(kind),
            timed.elapsed_ms,
            kind.source(),
            request.model_id.clone(),
        )
        .with_metadata("executor", json!(kind))
    }
}

/// Await a spawned call; a panicked task settles as a failure
async fn settle<O>(handle: JoinHandle<ExecutorResult<TimedOutput<O>>>) -> ExecutorResult<TimedOutput<O>> {
    match handle.await {
        Ok(result) => result,
        Err(join_err) if join_err.is_panic() => Err(ExecutorError::Panicked {
            reason: panic_message(join_err.into_panic()),
        }),
        Err(_) => Err(ExecutorError::Cancelled),
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
