//! Pipeline HTTP Routes
//!
//! Endpoints for submitting runs and polling their status.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::registry::{RegistryError, RunRecord, RunRegistry};

// ==================
// Shared State
// ==================

/// Pipeline state shared across handlers
pub struct PipelineState {
    pub registry: Arc<RunRegistry>,
}

// ==================
// Request/Response Types
// ==================

#[derive(Debug, Deserialize)]
pub struct StartPipelineRequest {
    pub dataset_path: String,
}

#[derive(Debug, Serialize)]
pub struct StartPipelineResponse {
    pub run_id: Uuid,
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
}

impl ErrorResponse {
    pub fn new(status: StatusCode, error: impl Into<String>) -> (StatusCode, Json<Self>) {
        (
            status,
            Json(Self {
                error: error.into(),
                code: status.as_u16(),
            }),
        )
    }
}

// ==================
// Pipeline Routes
// ==================

/// Create pipeline routes
pub fn pipeline_routes(state: Arc<PipelineState>) -> Router {
    Router::new()
        .route("/start", post(start_pipeline_handler))
        .route("/status/{run_id}", get(pipeline_status_handler))
        .with_state(state)
}

// ==================
// Handlers
// ==================

/// Submit a new pipeline run. Returns immediately; the run executes in
/// the background and is observable via the status endpoint and log feed.
async fn start_pipeline_handler(
    State(state): State<Arc<PipelineState>>,
    Json(request): Json<StartPipelineRequest>,
) -> Result<Json<StartPipelineResponse>, (StatusCode, Json<ErrorResponse>)> {
    let run_id = state
        .registry
        .submit(&request.dataset_path)
        .map_err(|e| match e {
            RegistryError::DatasetPathMissing(_) => {
                ErrorResponse::new(StatusCode::BAD_REQUEST, e.to_string())
            }
            _ => ErrorResponse::new(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
        })?;

    Ok(Json(StartPipelineResponse {
        run_id,
        status: "started".to_string(),
    }))
}

/// Snapshot of a run record
async fn pipeline_status_handler(
    State(state): State<Arc<PipelineState>>,
    Path(run_id): Path<Uuid>,
) -> Result<Json<RunRecord>, (StatusCode, Json<ErrorResponse>)> {
    let record = state.registry.status(run_id).map_err(|e| match e {
        RegistryError::RunNotFound(_) => ErrorResponse::new(StatusCode::NOT_FOUND, e.to_string()),
        _ => ErrorResponse::new(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    })?;

    Ok(Json(record))
}
