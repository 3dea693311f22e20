//! Error types for the inference module

use thiserror::Error;

use super::types::ExecutorKind;

/// Inference-specific errors
#[derive(Debug, Clone, Error, PartialEq)]
pub enum InferenceError {
    /// Model is registered neither as local- nor as cloud-capable
    #[error("Configuration error: model '{model_id}' is neither local- nor cloud-capable")]
    Configuration { model_id: String },

    /// A local or cloud executor call failed
    #[error("{executor} executor failed: {reason}")]
    ExecutorFailure { executor: ExecutorKind, reason: String },

    /// Both paths of a hybrid ensemble failed
    #[error("Ensemble exhausted, both paths failed (local: {local}; cloud: {cloud})")]
    EnsembleExhausted { local: String, cloud: String },

    /// Overall request deadline elapsed
    #[error("Inference timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// Another request with the same id is still in flight
    #[error("Request '{request_id}' is already in flight")]
    DuplicateRequest { request_id: String },
}

impl InferenceError {
    /// Build an executor failure from an [`ExecutorError`]
    pub fn executor(executor: ExecutorKind, err: ExecutorError) -> Self {
        InferenceError::ExecutorFailure {
            executor,
            reason: err.to_string(),
        }
    }

    /// Stable label used in logs and lifecycle events
    pub fn kind(&self) -> &'static str {
        match self {
            InferenceError::Configuration { .. } => "configuration",
            InferenceError::ExecutorFailure { .. } => "executor_failure",
            InferenceError::EnsembleExhausted { .. } => "ensemble_exhausted",
            InferenceError::Timeout { .. } => "timeout",
            InferenceError::DuplicateRequest { .. } => "duplicate_request",
        }
    }

    /// Whether a caller may reasonably retry the same request.
    ///
    /// The scheduler itself never retries.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            InferenceError::ExecutorFailure { .. }
                | InferenceError::EnsembleExhausted { .. }
                | InferenceError::Timeout { .. }
                | InferenceError::DuplicateRequest { .. }
        )
    }
}

/// Errors reported by a model-execution collaborator
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExecutorError {
    /// The model runtime crashed or rejected the call
    #[error("model execution failed: {reason}")]
    ModelFailed { reason: String },

    /// Transport to the remote service failed
    #[error("network error: {reason}")]
    Network { reason: String },

    /// The call observed cancellation and stopped early
    #[error("cancelled")]
    Cancelled,

    /// The executor task panicked
    #[error("executor panicked: {reason}")]
    Panicked { reason: String },
}

/// Result type for inference operations
pub type InferenceResult<T> = Result<T, InferenceError>;

/// Result type for executor calls
pub type ExecutorResult<T> = Result<T, ExecutorError>;
