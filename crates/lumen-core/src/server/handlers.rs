use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::AppState;
use super::error::ApiError;
use crate::pipeline::PipelineResponse;

/// Body of `POST /userquery`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    pub query: String,
}

/// Body of `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthResponse {
    pub status: String,
    pub backend: String,
}

/// Runs the generation pipeline for one query.
///
/// Any body that does not deserialize into [`QueryRequest`] is a validation
/// failure, whatever the extractor's own status would have been.
pub async fn user_query(
    State(state): State<AppState>,
    payload: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Json<PipelineResponse>, ApiError> {
    let Json(request) = payload.map_err(|rejection| ApiError::Validation(rejection.body_text()))?;
    debug!(query_len = request.query.len(), "Handling user query");

    let response = state.pipeline.run(&request.query).await?;
    Ok(Json(response))
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        backend: state.pipeline.backend_id().to_string(),
    })
}
