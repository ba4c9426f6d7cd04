//! Model HTTP Routes
//!
//! Endpoints for listing, downloading, and testing trained model artifacts.

use std::io::Cursor;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Serialize;

use crate::explain::{explain, ExplainError, ModelFamily};
use crate::registry::{list_artifacts, ArtifactEntry};

use super::pipeline_routes::ErrorResponse;

// ==================
// Shared State
// ==================

/// Model state shared across handlers
pub struct ModelState {
    pub models_dir: PathBuf,
}

// ==================
// Response Types
// ==================

#[derive(Debug, Serialize)]
pub struct ModelsListResponse {
    pub models: Vec<ArtifactEntry>,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct TestModelResponse {
    pub model: String,
    pub predicted_class: usize,
    pub class_label: String,
    pub confidence: f32,
    pub explanation: String,
    /// JPEG overlay as a `data:` URI
    pub heatmap_base64: String,
}

// ==================
// Model Routes
// ==================

/// Create model routes
pub fn model_routes(state: Arc<ModelState>) -> Router {
    Router::new()
        .route("/", get(list_models_handler))
        .route("/{name}/download", get(download_model_handler))
        .route("/test", post(test_model_handler))
        .with_state(state)
}

// ==================
// Handlers
// ==================

/// List trained model artifacts
async fn list_models_handler(State(state): State<Arc<ModelState>>) -> Json<ModelsListResponse> {
    let models = list_artifacts(&state.models_dir);
    let total = models.len();
    Json(ModelsListResponse { models, total })
}

/// Resolve a model family from a route or form value, accepting either
/// the bare family name (`resnet`) or the artifact file name
/// (`resnet_model.json`).
fn resolve_family(model_name: &str) -> Result<ModelFamily, ExplainError> {
    model_name
        .strip_suffix("_model.json")
        .unwrap_or(model_name)
        .parse()
}

/// Download a model artifact file by family name
async fn download_model_handler(
    State(state): State<Arc<ModelState>>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, (StatusCode, Json<ErrorResponse>)> {
    let family = resolve_family(&name).map_err(|_| {
        ErrorResponse::new(StatusCode::NOT_FOUND, format!("Model not found: {}", name))
    })?;

    let file_name = family.artifact_file_name();
    let path = state.models_dir.join(&file_name);
    let bytes = tokio::fs::read(&path).await.map_err(|_| {
        ErrorResponse::new(StatusCode::NOT_FOUND, format!("Model not found: {}", name))
    })?;

    Ok((
        [
            (header::CONTENT_TYPE, "application/json".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", file_name),
            ),
        ],
        bytes,
    ))
}

/// Classify an uploaded image with the named model and return the
/// prediction, rationale, and heatmap overlay.
///
/// Multipart fields: `model_name` (e.g. `resnet` or `resnet_model.json`)
/// and `file` (the image bytes).
async fn test_model_handler(
    State(state): State<Arc<ModelState>>,
    mut multipart: Multipart,
) -> Result<Json<TestModelResponse>, (StatusCode, Json<ErrorResponse>)> {
    let mut model_name: Option<String> = None;
    let mut image_bytes: Option<Vec<u8>> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ErrorResponse::new(StatusCode::BAD_REQUEST, e.to_string()))?
    {
        let name = field.name().map(|n| n.to_string());
        match name.as_deref() {
            Some("model_name") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ErrorResponse::new(StatusCode::BAD_REQUEST, e.to_string()))?;
                model_name = Some(text);
            }
            Some("file") => {
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ErrorResponse::new(StatusCode::BAD_REQUEST, e.to_string()))?;
                image_bytes = Some(data.to_vec());
            }
            _ => {}
        }
    }

    let model_name = model_name.ok_or_else(|| {
        ErrorResponse::new(StatusCode::BAD_REQUEST, "Missing field: model_name")
    })?;
    let image_bytes = image_bytes
        .ok_or_else(|| ErrorResponse::new(StatusCode::BAD_REQUEST, "Missing field: file"))?;

    let family = resolve_family(&model_name)
        .map_err(|e| ErrorResponse::new(StatusCode::BAD_REQUEST, e.to_string()))?;

    let models_dir = state.models_dir.clone();
    let result = tokio::task::spawn_blocking(move || explain(&image_bytes, family, &models_dir))
        .await
        .map_err(|e| ErrorResponse::new(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
        .map_err(explain_error_response)?;

    let mut jpeg = Vec::new();
    result
        .overlay
        .write_to(&mut Cursor::new(&mut jpeg), image::ImageOutputFormat::Jpeg(85))
        .map_err(|e| ErrorResponse::new(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    Ok(Json(TestModelResponse {
        model: family.as_str().to_string(),
        predicted_class: result.predicted_class,
        class_label: result.class_label,
        confidence: result.confidence,
        explanation: result.explanation,
        heatmap_base64: format!("data:image/jpeg;base64,{}", STANDARD.encode(&jpeg)),
    }))
}

fn explain_error_response(e: ExplainError) -> (StatusCode, Json<ErrorResponse>) {
    let status = match &e {
        ExplainError::UnsupportedFamily(_) | ExplainError::ImageDecode(_) => {
            StatusCode::BAD_REQUEST
        }
        ExplainError::Load(_) => StatusCode::NOT_FOUND,
        ExplainError::MalformedArtifact(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    ErrorResponse::new(status, e.to_string())
}
