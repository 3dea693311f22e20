//! Hybrid inference demo
//!
//! Loads the router configuration (path as first argument, platform config
//! directory otherwise), runs a small batch of requests against simulated
//! executors and prints the resulting statistics as JSON.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use serde_json::{json, Value};
use tokio::sync::broadcast::error::RecvError;

use hybrid_inference::config::{default_config_path, ConfigStore, ConfigStoreConfig};
use hybrid_inference::inference::{
    Complexity, ConnectionClass, DeviceCapabilities, InferenceRequest, ModelAffinityRegistry,
    MonitoredContextProbe, Priority, Scheduler, SimulatedExecutor,
};
use hybrid_inference::logging::LoggingSystem;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(default_config_path);

    let store = ConfigStore::new(ConfigStoreConfig::at(&config_path))
        .await
        .with_context(|| format!("loading configuration from {}", config_path.display()))?;
    let config = store.get().await;

    let _logging = LoggingSystem::init(config.logging.clone()).context("initializing logging")?;
    tracing::info!(path = %config_path.display(), "Hybrid inference demo starting");

    let affinity = Arc::new(ModelAffinityRegistry::from_config(&config.affinity));
    let probe = Arc::new(MonitoredContextProbe::new(config.stability.clone()));
    probe.report_link(true, ConnectionClass::Wifi, 80.0);
    for latency_ms in [42.0, 38.0, 45.0, 40.0] {
        probe.record_latency(latency_ms);
    }
    probe.report_device(DeviceCapabilities::default());

    let scheduler: Arc<Scheduler<Value, Value>> = Arc::new(Scheduler::with_config(
        config.scheduler.clone(),
        affinity,
        probe.clone(),
        Arc::new(SimulatedExecutor::local()),
        Arc::new(SimulatedExecutor::cloud()),
    ));

    let mut events = scheduler.subscribe();
    let event_logger = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => tracing::debug!(
                    request_id = %event.request_id,
                    stage = ?event.stage,
                    "Lifecycle event"
                ),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Lifecycle event logger lagged")
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    let handles: Vec<_> = demo_requests()
        .into_iter()
        .map(|request| {
            let scheduler = Arc::clone(&scheduler);
            tokio::spawn(async move { scheduler.infer(request).await })
        })
        .collect();

    for handle in handles {
        match handle.await.context("inference task failed")? {
            Ok(response) => println!(
                "{}",
                json!({
                    "request_id": response.request_id,
                    "model": response.model_used,
                    "source": response.source,
                    "confidence": response.confidence,
                    "processing_time_ms": response.processing_time_ms,
                    "strategy": response.metadata.get("strategy"),
                })
            ),
            Err(e) => println!("{}", json!({ "error": e.kind(), "message": e.to_string() })),
        }
    }

    // Link drops: everything stays on-device
    probe.report_link(false, ConnectionClass::None, 0.0);
    let offline = scheduler
        .infer(
            InferenceRequest::new("medical_report", json!({"visit": "follow-up"}))
                .with_complexity(Complexity::Complex),
        )
        .await;
    println!(
        "{}",
        json!({
            "offline_request": offline.map(|r| r.source.to_string()).unwrap_or_else(|e| e.kind().to_string())
        })
    );

    let report = json!({
        "routing": scheduler.routing_stats(),
        "performance": scheduler.performance_stats(),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);

    drop(scheduler);
    event_logger.await.context("event logger failed")?;
    Ok(())
}

fn demo_requests() -> Vec<InferenceRequest<Value>> {
    vec![
        InferenceRequest::new("symptom_screening", json!({"symptoms": ["headache", "fatigue"]}))
            .with_complexity(Complexity::Simple),
        InferenceRequest::new("medical_report", json!({"visit": "annual"}))
            .with_complexity(Complexity::Complex),
        InferenceRequest::new("treatment_recommendation", json!({"case": "chronic cough"}))
            .with_priority(Priority::Critical),
        InferenceRequest::new("vital_signs_analysis", json!({"heart_rate": 72}))
            .with_privacy(true),
        InferenceRequest::new("unregistered_model", json!({})),
    ]
}
