//! Schedule API Handlers
//!
//! Schedule management and the external dispatcher tick.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::Utc;
use relay_core::domain::schedule::Schedule;
use relay_core::dto::schedule::{CreateSchedule, DispatchReport, UpdateSchedule};
use uuid::Uuid;

use crate::api::error::ApiResult;
use crate::state::AppState;

/// POST /schedules
/// Create a schedule; `next_run_at` is computed from now
pub async fn create_schedule(
    State(state): State<AppState>,
    Json(req): Json<CreateSchedule>,
) -> ApiResult<(StatusCode, Json<Schedule>)> {
    tracing::info!(
        "Creating schedule '{}' for pipeline: {}",
        req.cron_expression,
        req.pipeline_id
    );

    let schedule = state.schedules.create(req, Utc::now()).await?;

    Ok((StatusCode::CREATED, Json(schedule)))
}

/// GET /schedules
pub async fn list_schedules(State(state): State<AppState>) -> ApiResult<Json<Vec<Schedule>>> {
    Ok(Json(state.schedules.list().await?))
}

/// PUT /schedules/{id}
/// Partial update; a new expression recomputes `next_run_at`
pub async fn update_schedule(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateSchedule>,
) -> ApiResult<Json<Schedule>> {
    tracing::info!("Updating schedule: {}", id);

    Ok(Json(state.schedules.update(id, req, Utc::now()).await?))
}

/// DELETE /schedules/{id}
pub async fn delete_schedule(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    tracing::info!("Deleting schedule: {}", id);

    state.schedules.delete(id).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// POST /scheduler/dispatch
/// Run one dispatcher tick now
pub async fn dispatch(State(state): State<AppState>) -> Json<DispatchReport> {
    Json(state.dispatcher.dispatch(Utc::now()).await)
}
