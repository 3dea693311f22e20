//! Per-model performance history
//!
//! Keeps a FIFO-bounded window of processing-time samples per model and
//! derives statistics on read.

use std::collections::{HashMap, VecDeque};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Default number of samples retained per model
pub const DEFAULT_HISTORY_CAPACITY: usize = 100;

/// Aggregate statistics for one model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelStats {
    pub avg_processing_time_ms: f64,
    pub sample_count: usize,
}

/// Opaque export of the full history, `model_id -> samples` oldest first
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistorySnapshot {
    pub models: HashMap<String, Vec<u64>>,
}

/// Bounded latency history keyed by model id
#[derive(Debug)]
pub struct PerformanceTracker {
    history: RwLock<HashMap<String, VecDeque<u64>>>,
    capacity: usize,
}

impl PerformanceTracker {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            history: RwLock::new(HashMap::new()),
            capacity: capacity.max(1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append a sample, evicting the oldest beyond capacity
    pub fn record(&self, model_id: &str, processing_time_ms: u64) {
        let mut history = self.history.write();
        let samples = history
            .entry(model_id.to_string())
            .or_insert_with(|| VecDeque::with_capacity(self.capacity));
        while samples.len() >= self.capacity {
            samples.pop_front();
        }
        samples.push_back(processing_time_ms);

        tracing::trace!(
            target: "metrics",
            model_id,
            processing_time_ms,
            samples = samples.len(),
            "Processing time recorded"
        );
    }

    /// Statistics for one model, `None` if nothing was recorded
    pub fn stats(&self, model_id: &str) -> Option<ModelStats> {
        let history = self.history.read();
        history.get(model_id).and_then(compute_stats)
    }

    /// Statistics for every model with samples
    pub fn all_stats(&self) -> HashMap<String, ModelStats> {
        let history = self.history.read();
        history
            .iter()
            .filter_map(|(model, samples)| compute_stats(samples).map(|s| (model.clone(), s)))
            .collect()
    }

    /// Retained samples for a model, oldest first
    pub fn samples(&self, model_id: &str) -> Vec<u64> {
        let history = self.history.read();
        history
            .get(model_id)
            .map(|s| s.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Export the full history
    pub fn export(&self) -> HistorySnapshot {
        let history = self.history.read();
        HistorySnapshot {
            models: history
                .iter()
                .map(|(model, samples)| (model.clone(), samples.iter().copied().collect()))
                .collect(),
        }
    }

    /// Replace the history with a snapshot, keeping only the newest
    /// `capacity` samples per model
    pub fn import(&self, snapshot: HistorySnapshot) {
        let mut restored = HashMap::with_capacity(snapshot.models.len());
        for (model, samples) in snapshot.models {
            let skip = samples.len().saturating_sub(self.capacity);
            let window: VecDeque<u64> = samples.into_iter().skip(skip).collect();
            if !window.is_empty() {
                restored.insert(model, window);
            }
        }
        *self.history.write() = restored;
    }

    pub fn clear(&self) {
        self.history.write().clear();
    }
}

impl Default for PerformanceTracker {
    fn default() -> Self {
        Self::new()
    }
}

fn compute_stats(samples: &VecDeque<u64>) -> Option<ModelStats> {
    if samples.is_empty() {
        return None;
    }
    let sum: u128 = samples.iter().map(|&s| s as u128).sum();
    Some(ModelStats {
        avg_processing_time_ms: sum as f64 / samples.len() as f64,
        sample_count: samples.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_average() {
        let tracker = PerformanceTracker::new();
        tracker.record("m", 10);
        tracker.record("m", 20);
        tracker.record("m", 60);

        let stats = tracker.stats("m").unwrap();
        assert_eq!(stats.sample_count, 3);
        assert_eq!(stats.avg_processing_time_ms, 30.0);
        assert!(tracker.stats("other").is_none());
    }

    #[test]
    fn test_fifo_eviction() {
        let tracker = PerformanceTracker::with_capacity(3);
        for sample in 1..=5 {
            tracker.record("m", sample);
        }
        assert_eq!(tracker.samples("m"), vec![3, 4, 5]);
    }

    #[test]
    fn test_export_import() {
        let tracker = PerformanceTracker::with_capacity(2);
        tracker.record("a", 1);
        tracker.record("a", 2);
        tracker.record("b", 7);

        let snapshot = tracker.export();
        let json = serde_json::to_string(&snapshot).unwrap();
        let decoded: HistorySnapshot = serde_json::from_str(&json).unwrap();

        let restored = PerformanceTracker::with_capacity(1);
        restored.import(decoded);
        assert_eq!(restored.samples("a"), vec![2]);
        assert_eq!(restored.samples("b"), vec![7]);
    }

    #[test]
    fn test_clear() {
        let tracker = PerformanceTracker::new();
        tracker.record("a", 1);
        tracker.clear();
        assert!(tracker.all_stats().is_empty());
    }
}
