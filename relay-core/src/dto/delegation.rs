//! Delegation DTOs

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Manual delegation request
///
/// Always starts at depth 0; nested hops are driven by the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DelegateRequest {
    pub from_agent_id: Uuid,
    pub to_agent_id: Uuid,
    pub message: String,
    pub caller_user_id: String,
}

/// Text returned by a delegation, including refusals and failures
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DelegateResponse {
    pub response: String,
}
