//! Common types for the inference module

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Free-form metadata attached to requests and responses
pub type Metadata = HashMap<String, serde_json::Value>;

/// Request priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
    Critical,
}

/// Estimated computational complexity of a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    Simple,
    #[default]
    Medium,
    Complex,
}

/// Where a response was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultSource {
    /// On-device executor
    Local,
    /// Remote executor
    Cloud,
    /// Ensemble of both
    Hybrid,
}

impl fmt::Display for ResultSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResultSource::Local => write!(f, "local"),
            ResultSource::Cloud => write!(f, "cloud"),
            ResultSource::Hybrid => write!(f, "hybrid"),
        }
    }
}

/// Which model-execution collaborator ran (or failed) a call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutorKind {
    Local,
    Cloud,
}

impl ExecutorKind {
    /// Source tag for a response produced by this executor alone
    pub fn source(self) -> ResultSource {
        match self {
            ExecutorKind::Local => ResultSource::Local,
            ExecutorKind::Cloud => ResultSource::Cloud,
        }
    }
}

impl fmt::Display for ExecutorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutorKind::Local => write!(f, "local"),
            ExecutorKind::Cloud => write!(f, "cloud"),
        }
    }
}

/// One unit of inference work.
///
/// Requests are never mutated once submitted; the scheduler shares them
/// behind an `Arc` for the lifetime of the call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceRequest<I> {
    /// Unique request identifier
    pub id: String,

    /// Model to run
    pub model_id: String,

    /// Opaque input payload
    pub input_data: I,

    /// Request priority
    pub priority: Priority,

    /// Overall deadline in milliseconds, 0 selects the scheduler default
    pub timeout_ms: u64,

    /// Input must not leave the device
    pub requires_privacy: bool,

    /// Estimated complexity
    pub complexity: Complexity,

    /// Caller metadata
    #[serde(default)]
    pub metadata: Metadata,
}

impl<I> InferenceRequest<I> {
    /// Create a request with a generated time-ordered id and default settings
    pub fn new(model_id: impl Into<String>, input_data: I) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            model_id: model_id.into(),
            input_data,
            priority: Priority::Normal,
            timeout_ms: 0,
            requires_privacy: false,
            complexity: Complexity::Medium,
            metadata: Metadata::new(),
        }
    }

    /// Use a caller-supplied id
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_complexity(mut self, complexity: Complexity) -> Self {
        self.complexity = complexity;
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn with_privacy(mut self, requires_privacy: bool) -> Self {
        self.requires_privacy = requires_privacy;
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

/// Value produced for a request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceResponse<O> {
    /// Request this response answers
    pub request_id: String,

    /// Opaque model output
    pub output: O,

    /// Confidence in [0, 1]
    pub confidence: f32,

    /// Processing time in milliseconds
    pub processing_time_ms: u64,

    /// Producing path
    pub source: ResultSource,

    /// Model that produced the output
    pub model_used: String,

    /// Routing and execution metadata
    #[serde(default)]
    pub metadata: Metadata,
}

impl<O> InferenceResponse<O> {
    /// Create a response, forcing the confidence into [0, 1]
    pub fn new(
        request_id: impl Into<String>,
        output: O,
        confidence: f32,
        processing_time_ms: u64,
        source: ResultSource,
        model_used: impl Into<String>,
    ) -> Self {
        Self {
            request_id: request_id.into(),
            output,
            confidence: clamp_confidence(confidence),
            processing_time_ms,
            source,
            model_used: model_used.into(),
            metadata: Metadata::new(),
        }
    }

    /// Add a metadata entry
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

/// Clamp a confidence score into [0, 1]; non-finite values become 0
pub fn clamp_confidence(value: f32) -> f32 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}
