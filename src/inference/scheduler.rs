//! Hybrid inference scheduler
//!
//! Façade that owns the in-flight request table and the performance history:
//! - Validates the model against the affinity registry
//! - Snapshots network and device context and asks the routing policy
//! - Runs the chosen strategy under the request deadline
//! - Records latency on success and emits lifecycle events
//!
//! The scheduler is an explicit value shared behind an `Arc`; construct one
//! per application (or per test).

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use super::affinity::ModelAffinityRegistry;
use super::context::ContextProbe;
use super::error::{InferenceError, InferenceResult};
use super::executor::ModelExecutor;
use super::merger::MergerConfig;
use super::policy::{PolicyConfig, RoutingDecision, RoutingPolicy, RoutingStrategy};
use super::strategy::{ConfidenceConfig, StrategyRunner};
use super::tracker::{HistorySnapshot, ModelStats, PerformanceTracker, DEFAULT_HISTORY_CAPACITY};
use super::types::{InferenceRequest, InferenceResponse, ResultSource};

/// Scheduler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Deadline applied to requests submitted with `timeout_ms == 0`
    pub default_timeout_ms: u64,

    /// Samples retained per model
    pub history_capacity: usize,

    /// Buffered lifecycle events per subscriber
    pub event_channel_capacity: usize,

    pub policy: PolicyConfig,

    pub confidence: ConfidenceConfig,

    pub merger: MergerConfig,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            default_timeout_ms: 30_000,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            event_channel_capacity: 256,
            policy: PolicyConfig::default(),
            confidence: ConfidenceConfig::default(),
            merger: MergerConfig::default(),
        }
    }
}

/// Stage of a request's lifecycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum RequestStage {
    Submitted {
        model_id: String,
    },
    Routed {
        strategy: RoutingStrategy,
        reasoning: String,
    },
    Executing,
    Completed {
        source: ResultSource,
        confidence: f32,
        processing_time_ms: u64,
    },
    Failed {
        error_kind: String,
        message: String,
    },
}

impl RequestStage {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RequestStage::Completed { .. } | RequestStage::Failed { .. })
    }
}

/// Lifecycle event broadcast to subscribers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleEvent {
    pub request_id: String,
    pub stage: RequestStage,
    pub timestamp: DateTime<Utc>,
}

/// Routing and outcome counters
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoutingStats {
    pub decisions: HashMap<RoutingStrategy, u64>,
    pub completed: u64,
    pub failed: u64,
    pub timed_out: u64,
    pub active: usize,
}

#[derive(Debug, Default)]
struct RoutingCounters {
    decisions: [AtomicU64; 5],
    completed: AtomicU64,
    failed: AtomicU64,
    timed_out: AtomicU64,
}

impl RoutingCounters {
    fn record_decision(&self, strategy: RoutingStrategy) {
        self.decisions[strategy.index()].fetch_add(1, Ordering::Relaxed);
    }

    fn record_outcome<T>(&self, outcome: &InferenceResult<T>) {
        match outcome {
            Ok(_) => self.completed.fetch_add(1, Ordering::Relaxed),
            Err(InferenceError::Timeout { .. }) => {
                self.failed.fetch_add(1, Ordering::Relaxed);
                self.timed_out.fetch_add(1, Ordering::Relaxed)
            }
            Err(_) => self.failed.fetch_add(1, Ordering::Relaxed),
        };
    }
}

/// Holds a request's in-flight table entry; releases it on drop
struct InFlightSlot<'a, I> {
    table: &'a DashMap<String, Arc<InferenceRequest<I>>>,
    request_id: String,
}

impl<I> Drop for InFlightSlot<'_, I> {
    fn drop(&mut self) {
        self.table.remove(&self.request_id);
    }
}

/// Routes and executes inference requests
pub struct Scheduler<I, O> {
    affinity: Arc<ModelAffinityRegistry>,
    probe: Arc<dyn ContextProbe>,
    policy: RoutingPolicy,
    runner: StrategyRunner<I, O>,
    in_flight: DashMap<String, Arc<InferenceRequest<I>>>,
    tracker: PerformanceTracker,
    counters: RoutingCounters,
    events: broadcast::Sender<LifecycleEvent>,
    config: SchedulerConfig,
}

impl<I, O> Scheduler<I, O>
where
    I: Send + Sync + 'static,
    O: Send + 'static,
{
    /// Create a scheduler with default configuration
    pub fn new(
        affinity: Arc<ModelAffinityRegistry>,
        probe: Arc<dyn ContextProbe>,
        local: Arc<dyn ModelExecutor<I, O>>,
        cloud: Arc<dyn ModelExecutor<I, O>>,
    ) -> Self {
        Self::with_config(SchedulerConfig::default(), affinity, probe, local, cloud)
    }

    /// Create a scheduler with explicit configuration
    pub fn with_config(
        config: SchedulerConfig,
        affinity: Arc<ModelAffinityRegistry>,
        probe: Arc<dyn ContextProbe>,
        local: Arc<dyn ModelExecutor<I, O>>,
        cloud: Arc<dyn ModelExecutor<I, O>>,
    ) -> Self {
        let (events, _) = broadcast::channel(config.event_channel_capacity.max(1));
        Self {
            policy: RoutingPolicy::with_config(Arc::clone(&affinity), config.policy.clone()),
            runner: StrategyRunner::new(local, cloud)
                .with_confidence(config.confidence.clone())
                .with_merger_config(config.merger.clone()),
            affinity,
            probe,
            in_flight: DashMap::new(),
            tracker: PerformanceTracker::with_capacity(config.history_capacity),
            counters: RoutingCounters::default(),
            events,
            config,
        }
    }

    /// Run one request to completion, failure or timeout.
    ///
    /// The request's in-flight entry exists for exactly the duration of this
    /// call and is removed before the result is returned, whatever the outcome.
    pub async fn infer(&self, request: InferenceRequest<I>) -> InferenceResult<InferenceResponse<O>> {
        let request = Arc::new(request);
        let request_id = request.id.clone();
        let slot = self.acquire(&request)?;

        self.emit(
            &request_id,
            RequestStage::Submitted {
                model_id: request.model_id.clone(),
            },
        );

        let outcome = self.route_and_execute(&request).await;
        drop(slot);

        self.counters.record_outcome(&outcome);
        match &outcome {
            Ok(response) => {
                self.tracker
                    .record(&request.model_id, response.processing_time_ms);
                tracing::info!(
                    request_id = %request_id,
                    model_id = %request.model_id,
                    source = %response.source,
                    confidence = response.confidence,
                    processing_time_ms = response.processing_time_ms,
                    "Inference completed"
                );
                self.emit(
                    &request_id,
                    RequestStage::Completed {
                        source: response.source,
                        confidence: response.confidence,
                        processing_time_ms: response.processing_time_ms,
                    },
                );
            }
            Err(e) => {
                tracing::warn!(
                    request_id = %request_id,
                    model_id = %request.model_id,
                    error_kind = e.kind(),
                    error = %e,
                    "Inference failed"
                );
                self.emit(
                    &request_id,
                    RequestStage::Failed {
                        error_kind: e.kind().to_string(),
                        message: e.to_string(),
                    },
                );
            }
        }

        outcome
    }

    async fn route_and_execute(
        &self,
        request: &Arc<InferenceRequest<I>>,
    ) -> InferenceResult<InferenceResponse<O>> {
        self.affinity.ensure_known(&request.model_id)?;

        let network = self.probe.current_network_status();
        let device = self.probe.current_device_capabilities();
        let decision = self.policy.decide(request.as_ref(), &network, &device);
        self.counters.record_decision(decision.strategy);

        tracing::debug!(
            request_id = %request.id,
            model_id = %request.model_id,
            strategy = %decision.strategy,
            reasoning = %decision.reasoning,
            online = network.is_online,
            stable = network.is_stable,
            battery = device.battery_percent,
            "Request routed"
        );
        self.emit(
            &request.id,
            RequestStage::Routed {
                strategy: decision.strategy,
                reasoning: decision.reasoning.clone(),
            },
        );
        self.emit(&request.id, RequestStage::Executing);

        let timeout_ms = self.effective_timeout_ms(request);
        let cancel = CancellationToken::new();
        // Signals outstanding executor calls on every exit path
        let _cancel_on_exit = cancel.clone().drop_guard();

        let execution = self.runner.execute(decision.strategy, request, &cancel);
        match tokio::time::timeout(Duration::from_millis(timeout_ms), execution).await {
            Ok(result) => result.map(|response| annotate(response, &decision)),
            Err(_) => Err(InferenceError::Timeout { timeout_ms }),
        }
    }

    fn acquire<'a>(
        &'a self,
        request: &Arc<InferenceRequest<I>>,
    ) -> InferenceResult<InFlightSlot<'a, I>> {
        match self.in_flight.entry(request.id.clone()) {
            Entry::Occupied(_) => {
                tracing::warn!(request_id = %request.id, "Rejected duplicate in-flight request");
                Err(InferenceError::DuplicateRequest {
                    request_id: request.id.clone(),
                })
            }
            Entry::Vacant(vacant) => {
                vacant.insert(Arc::clone(request));
                Ok(InFlightSlot {
                    table: &self.in_flight,
                    request_id: request.id.clone(),
                })
            }
        }
    }

    fn effective_timeout_ms(&self, request: &InferenceRequest<I>) -> u64 {
        if request.timeout_ms == 0 {
            self.config.default_timeout_ms
        } else {
            request.timeout_ms
        }
    }

    fn emit(&self, request_id: &str, stage: RequestStage) {
        // No subscribers is not an error
        let _ = self.events.send(LifecycleEvent {
            request_id: request_id.to_string(),
            stage,
            timestamp: Utc::now(),
        });
    }

    /// Number of requests currently in flight
    pub fn active_request_count(&self) -> usize {
        self.in_flight.len()
    }

    /// Whether a request id is currently in flight
    pub fn is_in_flight(&self, request_id: &str) -> bool {
        self.in_flight.contains_key(request_id)
    }

    /// Per-model latency statistics
    pub fn performance_stats(&self) -> HashMap<String, ModelStats> {
        self.tracker.all_stats()
    }

    /// Latency statistics for one model
    pub fn model_stats(&self, model_id: &str) -> Option<ModelStats> {
        self.tracker.stats(model_id)
    }

    /// Export the performance history
    pub fn export_history(&self) -> HistorySnapshot {
        self.tracker.export()
    }

    /// Replace the performance history
    pub fn import_history(&self, snapshot: HistorySnapshot) {
        self.tracker.import(snapshot)
    }

    /// Routing decision and outcome counters
    pub fn routing_stats(&self) -> RoutingStats {
        RoutingStats {
            decisions: RoutingStrategy::ALL
                .iter()
                .map(|s| (*s, self.counters.decisions[s.index()].load(Ordering::Relaxed)))
                .collect(),
            completed: self.counters.completed.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
            timed_out: self.counters.timed_out.load(Ordering::Relaxed),
            active: self.active_request_count(),
        }
    }

    /// Subscribe to lifecycle events
    pub fn subscribe(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.events.subscribe()
    }

    /// Affinity registry, for hot reload
    pub fn affinity(&self) -> &Arc<ModelAffinityRegistry> {
        &self.affinity
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }
}

fn annotate<O>(response: InferenceResponse<O>, decision: &RoutingDecision) -> InferenceResponse<O> {
    response
        .with_metadata("strategy", json!(decision.strategy))
        .with_metadata("reasoning", json!(decision.reasoning))
}
