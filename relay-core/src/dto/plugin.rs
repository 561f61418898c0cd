//! Plugin step DTOs

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Request to store a plugin step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePlugin {
    pub name: String,
    pub code: String,
    #[serde(default)]
    pub input_schema: JsonValue,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

/// Partial plugin edit; code is re-validated before it is stored
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdatePlugin {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub input_schema: Option<JsonValue>,
    #[serde(default)]
    pub enabled: Option<bool>,
}

/// Parse-only check request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidatePlugin {
    pub code: String,
}

/// Parse-only check outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Ad-hoc run of a stored plugin
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunPlugin {
    #[serde(default)]
    pub input: JsonValue,
}

fn default_enabled() -> bool {
    true
}
