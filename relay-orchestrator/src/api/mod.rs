//! API Module
//!
//! HTTP API layer for the orchestrator.
//! Each submodule handles endpoints for a specific domain.

pub mod agent;
pub mod error;
pub mod execution;
pub mod health;
pub mod pipeline;
pub mod plugin;
pub mod schedule;

use axum::{
    Router,
    routing::{get, post, put},
};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Create the main API router with all endpoints
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Agent endpoints
        .route("/agents", post(agent::create_agent).get(agent::list_agents))
        .route("/agents/{id}", get(agent::get_agent))
        .route("/agents/{id}/enabled", post(agent::set_agent_enabled))
        .route("/agents/{id}/delegations", get(agent::list_delegations))
        .route("/delegations", post(agent::delegate))
        // Pipeline endpoints
        .route(
            "/pipelines",
            post(pipeline::create_pipeline).get(pipeline::list_pipelines),
        )
        .route(
            "/pipelines/{id}",
            get(pipeline::get_pipeline).delete(pipeline::delete_pipeline),
        )
        .route("/pipelines/{id}/versions", post(pipeline::create_version))
        // Execution endpoints
        .route(
            "/pipelines/{id}/executions",
            post(execution::trigger_execution).get(execution::list_executions),
        )
        .route("/executions/{id}", get(execution::get_execution))
        .route("/executions/{id}/stream", get(execution::stream_execution))
        .route("/executions/{id}/cancel", post(execution::cancel_execution))
        .route(
            "/executions/{id}/share",
            post(execution::share_execution).delete(execution::unshare_execution),
        )
        .route("/shared/{token}", get(execution::get_shared_execution))
        // Schedule endpoints
        .route(
            "/schedules",
            post(schedule::create_schedule).get(schedule::list_schedules),
        )
        .route(
            "/schedules/{id}",
            put(schedule::update_schedule).delete(schedule::delete_schedule),
        )
        .route("/scheduler/dispatch", post(schedule::dispatch))
        // Plugin endpoints
        .route("/plugins", post(plugin::create_plugin).get(plugin::list_plugins))
        .route("/plugins/validate", post(plugin::validate_plugin))
        .route(
            "/plugins/{id}",
            get(plugin::get_plugin).put(plugin::update_plugin),
        )
        .route("/plugins/{id}/run", post(plugin::run_plugin))
        // Add state and middleware
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
