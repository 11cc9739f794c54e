//! API Error Types

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use pipeline::PipelineError;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// Errors returned by gateway handlers
///
/// Load and inference failures both map to 500, but the messages stay
/// distinguishable so callers can tell which phase failed.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Pipeline could not be obtained for the requested task/model
    #[error("error loading pipeline: {0}")]
    PipelineLoad(PipelineError),

    /// Pipeline loaded but invocation failed
    #[error("inference error: {0}")]
    Inference(PipelineError),

    /// Request rejected by the authorization hook
    #[error("unauthorized: {0}")]
    Unauthorized(String),
}

/// JSON error body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::PipelineLoad(_) | ApiError::Inference(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let detail = self.to_string();
        error!("Request failed: {}", detail);
        (self.status(), Json(ErrorResponse { error: detail })).into_response()
    }
}
