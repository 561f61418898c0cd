//! Agent API Handlers
//!
//! Agent registry and delegation endpoints.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use relay_core::domain::agent::Agent;
use relay_core::domain::delegation::Delegation;
use relay_core::dto::agent::{CreateAgent, SetAgentEnabled};
use relay_core::dto::delegation::{DelegateRequest, DelegateResponse};
use relay_engine::service::DelegationRequest;
use uuid::Uuid;

use crate::api::error::ApiResult;
use crate::state::AppState;

/// POST /agents
/// Register an agent
pub async fn create_agent(
    State(state): State<AppState>,
    Json(req): Json<CreateAgent>,
) -> ApiResult<(StatusCode, Json<Agent>)> {
    tracing::info!("Registering agent: {}", req.name);

    let agent = state.agents.create(req).await?;

    Ok((StatusCode::CREATED, Json(agent)))
}

/// GET /agents
pub async fn list_agents(State(state): State<AppState>) -> ApiResult<Json<Vec<Agent>>> {
    Ok(Json(state.agents.list().await?))
}

/// GET /agents/{id}
pub async fn get_agent(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Agent>> {
    Ok(Json(state.agents.get(id).await?))
}

/// POST /agents/{id}/enabled
/// Enable or disable an agent
pub async fn set_agent_enabled(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<SetAgentEnabled>,
) -> ApiResult<Json<Agent>> {
    tracing::info!("Setting agent {} enabled={}", id, req.enabled);

    Ok(Json(state.agents.set_enabled(id, req.enabled).await?))
}

/// GET /agents/{id}/delegations
/// Delegation audit history for an agent
pub async fn list_delegations(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Vec<Delegation>>> {
    tracing::debug!("Listing delegations for agent: {}", id);

    Ok(Json(state.agents.delegations(id).await?))
}

/// POST /delegations
/// Manually delegate a message from one agent to another
///
/// Refusals and target failures come back as response text with 200.
pub async fn delegate(
    State(state): State<AppState>,
    Json(req): Json<DelegateRequest>,
) -> ApiResult<Json<DelegateResponse>> {
    tracing::info!(
        "Manual delegation {} -> {} for {}",
        req.from_agent_id,
        req.to_agent_id,
        req.caller_user_id
    );

    state.agents.get(req.from_agent_id).await?;

    let response = state
        .delegation
        .delegate(DelegationRequest {
            from_agent_id: req.from_agent_id,
            to_agent_id: req.to_agent_id,
            caller_user_id: req.caller_user_id,
            message: req.message,
            depth: 0,
        })
        .await;

    Ok(Json(DelegateResponse { response }))
}
