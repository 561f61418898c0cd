//! Agent domain model
//!
//! An agent is a configured LLM persona that pipeline steps and delegations
//! invoke through the agent runner.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A configured agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub id: Uuid,

    /// Display name
    pub name: String,

    /// Tenant that owns this agent
    pub owner_id: String,

    /// Model identifier passed through to the agent runner
    pub model: String,

    /// Default instructions (system prompt)
    pub instructions: String,

    /// Disabled agents cannot be invoked or delegated to
    pub enabled: bool,

    pub created_at: DateTime<Utc>,
}
