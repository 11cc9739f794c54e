//! Gateway Route
//!
//! `POST /ai-gateway`: resolve the pipeline for (task, model) through
//! the registry and run it with the request's inputs and options.

use axum::{
    extract::State,
    http::{header, HeaderMap},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::debug;

use crate::error::ApiError;
use crate::AppState;

/// Task selection and pipeline options
#[derive(Debug, Deserialize)]
pub struct Parameters {
    /// Task identifier, e.g. "sentiment-analysis"
    pub task: String,
    /// Options forwarded verbatim to the pipeline, which validates them
    #[serde(default)]
    pub options: Map<String, Value>,
}

/// Request body for the gateway endpoint
#[derive(Debug, Deserialize)]
pub struct GatewayRequest {
    /// Model identifier understood by the pipeline backend
    pub model: String,
    /// Task-specific input payload, string or structured
    pub inputs: Value,
    pub parameters: Parameters,
}

/// Response envelope
#[derive(Debug, Serialize)]
pub struct GatewayResponse {
    pub result: Value,
}

/// Dispatch an inference request
pub async fn dispatch(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<GatewayRequest>,
) -> Result<Json<GatewayResponse>, ApiError> {
    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());
    state.auth.authorize(authorization)?;

    let GatewayRequest {
        model,
        inputs,
        parameters,
    } = body;
    let Parameters { task, options } = parameters;

    let pipe = state
        .registry
        .get_or_load(&task, &model)
        .await
        .map_err(ApiError::PipelineLoad)?;

    debug!("Dispatching {} inference to {}", task, model);

    let result = pipeline::invoke(pipe, inputs, options)
        .await
        .map_err(ApiError::Inference)?;

    Ok(Json(GatewayResponse { result }))
}
