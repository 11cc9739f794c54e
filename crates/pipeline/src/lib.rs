//! Inference Pipeline Registry
//!
//! Pipeline abstraction plus a concurrent, process-wide registry that
//! loads pipelines lazily and reuses them for the process lifetime.

mod builtin;
mod pipeline;
mod registry;

pub use builtin::BuiltinLoader;
pub use pipeline::{invoke, Pipeline, PipelineKey, PipelineLoader};
pub use registry::PipelineRegistry;

use thiserror::Error;

/// Errors during pipeline loading and invocation
#[derive(Debug, Clone, Error)]
pub enum PipelineError {
    /// Backend does not implement the requested task
    #[error("unsupported task: {0}")]
    UnsupportedTask(String),

    /// Model could not be resolved for the task
    #[error("model '{model}' not found for task '{task}'")]
    ModelNotFound { task: String, model: String },

    /// Pipeline construction failed
    #[error("pipeline construction failed: {0}")]
    LoadFailed(String),

    /// Inputs or options rejected by the pipeline
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Pipeline invocation failed at runtime
    #[error("pipeline execution failed: {0}")]
    InferenceFailed(String),
}
