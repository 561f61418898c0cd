//! Pipeline API Handlers
//!
//! HTTP endpoints for pipeline management.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use relay_core::domain::pipeline::Pipeline;
use relay_core::dto::pipeline::CreatePipeline;
use uuid::Uuid;

use crate::api::error::ApiResult;
use crate::state::AppState;

/// POST /pipelines
/// Create a new pipeline
pub async fn create_pipeline(
    State(state): State<AppState>,
    Json(req): Json<CreatePipeline>,
) -> ApiResult<(StatusCode, Json<Pipeline>)> {
    tracing::info!("Creating pipeline: {}", req.name);

    let pipeline = state.pipelines.create(req).await?;

    Ok((StatusCode::CREATED, Json(pipeline)))
}

/// POST /pipelines/{id}/versions
/// Store a new version of a pipeline; the previous version is deactivated
pub async fn create_version(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<CreatePipeline>,
) -> ApiResult<(StatusCode, Json<Pipeline>)> {
    tracing::info!("Creating new version of pipeline: {}", id);

    let pipeline = state.pipelines.new_version(id, req).await?;

    Ok((StatusCode::CREATED, Json(pipeline)))
}

/// GET /pipelines
/// List all pipelines
pub async fn list_pipelines(State(state): State<AppState>) -> ApiResult<Json<Vec<Pipeline>>> {
    tracing::debug!("Listing all pipelines");

    Ok(Json(state.pipelines.list().await?))
}

/// GET /pipelines/{id}
/// Get pipeline by ID
pub async fn get_pipeline(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Pipeline>> {
    tracing::debug!("Getting pipeline: {}", id);

    Ok(Json(state.pipelines.get(id).await?))
}

/// DELETE /pipelines/{id}
/// Delete a pipeline
pub async fn delete_pipeline(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    tracing::info!("Deleting pipeline: {}", id);

    state.pipelines.delete(id).await?;

    Ok(StatusCode::NO_CONTENT)
}
