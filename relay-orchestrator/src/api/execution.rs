//! Execution API Handlers
//!
//! Trigger, poll, stream, cancel and share pipeline executions.

use std::convert::Infallible;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
};
use relay_core::domain::execution::Execution;
use relay_core::dto::execution::{ShareLink, TriggerExecution};
use relay_engine::progress::ProgressEvent;
use serde_json::json;
use tokio_stream::{Stream, StreamExt, wrappers::ReceiverStream};
use uuid::Uuid;

use crate::api::error::ApiResult;
use crate::state::AppState;

// =============================================================================
// Lifecycle Endpoints
// =============================================================================

/// POST /pipelines/{id}/executions
/// Create a pending execution and queue it; returns before any step runs
pub async fn trigger_execution(
    State(state): State<AppState>,
    Path(pipeline_id): Path<Uuid>,
    Json(req): Json<TriggerExecution>,
) -> ApiResult<(StatusCode, Json<Execution>)> {
    tracing::info!("Triggering execution for pipeline: {}", pipeline_id);

    let execution = state.queue.trigger(pipeline_id, req.input).await?;

    Ok((StatusCode::ACCEPTED, Json(execution)))
}

/// GET /pipelines/{id}/executions
/// List executions of a pipeline, newest first
pub async fn list_executions(
    State(state): State<AppState>,
    Path(pipeline_id): Path<Uuid>,
) -> ApiResult<Json<Vec<Execution>>> {
    tracing::debug!("Listing executions for pipeline: {}", pipeline_id);

    Ok(Json(state.engine.list_executions(pipeline_id).await?))
}

/// GET /executions/{id}
pub async fn get_execution(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Execution>> {
    tracing::debug!("Getting execution: {}", id);

    Ok(Json(state.engine.get_execution(id).await?))
}

/// POST /executions/{id}/cancel
/// Request cancellation; the run stops before its next step
pub async fn cancel_execution(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    tracing::info!("Cancelling execution: {}", id);

    state.engine.request_cancel(id).await?;

    Ok(StatusCode::ACCEPTED)
}

// =============================================================================
// Progress Stream
// =============================================================================

/// GET /executions/{id}/stream
/// Server-sent progress events until the execution settles
pub async fn stream_execution(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    state.engine.get_execution(id).await?;
    tracing::debug!("Opening progress stream for execution: {}", id);

    let events = ReceiverStream::new(state.notifier.subscribe(id)).map(|event| Ok(to_sse(event)));

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

fn to_sse(event: ProgressEvent) -> Event {
    let name = event.name();
    let payload = match event {
        ProgressEvent::Connected | ProgressEvent::Done => json!({}),
        ProgressEvent::Update(update) => serde_json::to_value(update)
            .unwrap_or_else(|e| json!({ "error": format!("unserializable update: {}", e) })),
        ProgressEvent::Error(message) => json!({ "error": message }),
    };

    Event::default().event(name).data(payload.to_string())
}

// =============================================================================
// Sharing
// =============================================================================

/// POST /executions/{id}/share
/// Create (or replace) a public read-only link token
pub async fn share_execution(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ShareLink>> {
    tracing::info!("Sharing execution: {}", id);

    let token = state.engine.share(id).await?;

    Ok(Json(ShareLink { token }))
}

/// DELETE /executions/{id}/share
pub async fn unshare_execution(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    tracing::info!("Revoking share link for execution: {}", id);

    state.engine.unshare(id).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// GET /shared/{token}
/// Read-only view of a shared execution
pub async fn get_shared_execution(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> ApiResult<Json<Execution>> {
    Ok(Json(state.engine.find_shared(&token).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_core::domain::execution::ExecutionStatus;
    use relay_core::dto::execution::ExecutionUpdate;

    #[test]
    fn test_update_event_carries_camel_case_payload() {
        let execution = Execution::new(Uuid::new_v4(), json!("hi"));
        let update = ExecutionUpdate::from(&execution);
        let payload = serde_json::to_value(&update).unwrap();

        assert_eq!(payload["status"], json!(ExecutionStatus::Pending.as_str()));
        assert!(payload.get("currentStepId").is_some());
        assert!(payload.get("stepResults").is_some());

        // Event has no public accessors; building it must not panic
        let _ = to_sse(ProgressEvent::Update(update));
        let _ = to_sse(ProgressEvent::Error("gone".to_string()));
    }
}
