//! Agent DTOs

use serde::{Deserialize, Serialize};

/// Request to register an agent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAgent {
    pub name: String,
    pub owner_id: String,
    pub model: String,
    #[serde(default)]
    pub instructions: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

/// Request to enable or disable an agent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetAgentEnabled {
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}
