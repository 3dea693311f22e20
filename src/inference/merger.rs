//! Ensemble combiner
//!
//! Fuses the results of a hybrid ensemble into one response:
//! - The output of the single most confident result is returned as-is
//! - Reported confidence is the mean confidence boosted by `boost_factor`,
//!   capped at `confidence_cap`
//!
//! Outputs of different models are not averaged; only the winning model's
//! output is returned. The boost-and-cap keeps agreement from being reported
//! as certainty, so changes to the constants belong in [`MergerConfig`].

use serde::{Deserialize, Serialize};

use super::types::{clamp_confidence, InferenceResponse};

/// Combiner configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MergerConfig {
    /// Multiplier applied to the mean confidence of multiple results
    pub boost_factor: f32,

    /// Upper bound on the reported ensemble confidence
    pub confidence_cap: f32,
}

impl Default for MergerConfig {
    fn default() -> Self {
        Self {
            boost_factor: 1.1,
            confidence_cap: 0.95,
        }
    }
}

/// Output of a combine step
#[derive(Debug, Clone)]
pub struct CombinedOutput<O> {
    /// Winning result, with its own confidence replaced by the ensemble one
    pub winner: InferenceResponse<O>,
    /// Ensemble confidence
    pub confidence: f32,
    /// Number of results that were combined
    pub ensemble_size: usize,
}

/// Merges ensemble results
#[derive(Debug, Clone, Default)]
pub struct EnsembleCombiner {
    config: MergerConfig,
}

impl EnsembleCombiner {
    pub fn new() -> Self {
        Self::with_config(MergerConfig::default())
    }

    pub fn with_config(config: MergerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MergerConfig {
        &self.config
    }

    /// Combine results; `None` when there is nothing to combine.
    ///
    /// A single result is returned unchanged. Ties on confidence go to the
    /// earlier result.
    pub fn combine<O>(&self, results: Vec<InferenceResponse<O>>) -> Option<CombinedOutput<O>> {
        let ensemble_size = results.len();
        if ensemble_size <= 1 {
            return results.into_iter().next().map(|winner| CombinedOutput {
                confidence: winner.confidence,
                winner,
                ensemble_size,
            });
        }

        let confidences: Vec<f32> = results.iter().map(|r| r.confidence).collect();
        let confidence = self.combined_confidence(&confidences);

        let mut best: Option<InferenceResponse<O>> = None;
        for result in results {
            let better = match &best {
                Some(current) => result.confidence > current.confidence,
                None => true,
            };
            if better {
                best = Some(result);
            }
        }

        best.map(|mut winner| {
            winner.confidence = confidence;
            CombinedOutput {
                winner,
                confidence,
                ensemble_size,
            }
        })
    }

    /// `min(mean * boost_factor, confidence_cap)` for two or more scores;
    /// a single score is passed through.
    pub fn combined_confidence(&self, confidences: &[f32]) -> f32 {
        match confidences.len() {
            0 => 0.0,
            1 => clamp_confidence(confidences[0]),
            n => {
                let mean = confidences.iter().sum::<f32>() / n as f32;
                clamp_confidence((mean * self.config.boost_factor).min(self.config.confidence_cap))
            }
        }
    }
}
