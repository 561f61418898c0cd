//! Plugin API Handlers
//!
//! Sandboxed plugin step management. Code is compiled before it is stored.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use relay_core::domain::plugin::{PluginRunResult, PluginStep};
use relay_core::dto::plugin::{CreatePlugin, RunPlugin, UpdatePlugin, ValidatePlugin, ValidationReport};
use relay_engine::service::validate_code;
use uuid::Uuid;

use crate::api::error::ApiResult;
use crate::state::AppState;

/// POST /plugins
pub async fn create_plugin(
    State(state): State<AppState>,
    Json(req): Json<CreatePlugin>,
) -> ApiResult<(StatusCode, Json<PluginStep>)> {
    tracing::info!("Creating plugin: {}", req.name);

    let plugin = state.plugins.create(req).await?;

    Ok((StatusCode::CREATED, Json(plugin)))
}

/// GET /plugins
pub async fn list_plugins(State(state): State<AppState>) -> ApiResult<Json<Vec<PluginStep>>> {
    Ok(Json(state.plugins.list().await?))
}

/// GET /plugins/{id}
pub async fn get_plugin(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<PluginStep>> {
    Ok(Json(state.plugins.get(id).await?))
}

/// PUT /plugins/{id}
pub async fn update_plugin(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdatePlugin>,
) -> ApiResult<Json<PluginStep>> {
    tracing::info!("Updating plugin: {}", id);

    Ok(Json(state.plugins.update(id, req).await?))
}

/// POST /plugins/validate
/// Parse-only check; always 200, the report says whether it compiled
pub async fn validate_plugin(Json(req): Json<ValidatePlugin>) -> Json<ValidationReport> {
    Json(validate_code(&req.code))
}

/// POST /plugins/{id}/run
/// Run a stored plugin against an ad-hoc input
pub async fn run_plugin(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<RunPlugin>,
) -> ApiResult<Json<PluginRunResult>> {
    tracing::info!("Running plugin: {}", id);

    Ok(Json(state.plugins.run(id, req.input).await?))
}
