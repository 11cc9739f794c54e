//! Pipeline Abstraction

use crate::PipelineError;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

/// Key identifying a loaded pipeline by (task, model)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PipelineKey {
    task: String,
    model: String,
}

impl PipelineKey {
    /// Create a key from task and model identifiers
    pub fn new(task: &str, model: &str) -> Self {
        Self {
            task: task.to_string(),
            model: model.to_string(),
        }
    }

    /// Task identifier
    pub fn task(&self) -> &str {
        &self.task
    }

    /// Model identifier
    pub fn model(&self) -> &str {
        &self.model
    }
}

impl fmt::Display for PipelineKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.task, self.model)
    }
}

/// A loaded, callable inference pipeline
///
/// Implementations are stateful but treated as immutable once loaded;
/// one instance serves concurrent calls for the process lifetime.
pub trait Pipeline: Send + Sync {
    /// Run inference on `inputs` with pipeline-specific `options`
    ///
    /// Options are an open configuration map validated by the pipeline
    /// itself, not by the gateway.
    fn run(&self, inputs: &Value, options: &Map<String, Value>) -> Result<Value, PipelineError>;
}

/// Constructs pipelines for (task, model) keys
///
/// `load` may block for the full duration of a model load; the registry
/// only ever calls it from the blocking pool.
pub trait PipelineLoader: Send + Sync + 'static {
    /// Build a pipeline for `key`, materializing whatever the backend needs
    fn load(&self, key: &PipelineKey) -> Result<Box<dyn Pipeline>, PipelineError>;
}

/// Invoke a pipeline on the blocking pool
///
/// Inference can occupy a core for a long time; running it inline would
/// stall the request loop.
pub async fn invoke(
    pipeline: Arc<dyn Pipeline>,
    inputs: Value,
    options: Map<String, Value>,
) -> Result<Value, PipelineError> {
    tokio::task::spawn_blocking(move || pipeline.run(&inputs, &options))
        .await
        .map_err(|e| PipelineError::InferenceFailed(format!("inference task panicked: {}", e)))?
}
