//! Schedule and dispatch DTOs

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

/// Request to create a schedule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSchedule {
    pub pipeline_id: Uuid,
    pub cron_expression: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub input_template: Option<JsonValue>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

/// Partial schedule update; absent fields are left unchanged
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateSchedule {
    #[serde(default)]
    pub cron_expression: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub input_template: Option<JsonValue>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

/// Outcome of one dispatcher tick
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DispatchReport {
    /// Executions submitted during this tick
    pub triggered: usize,
    pub failures: Vec<DispatchFailure>,
}

/// A firing that could not be submitted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchFailure {
    pub pipeline_id: Uuid,
    pub schedule_id: Option<Uuid>,
    pub error: String,
}

fn default_active() -> bool {
    true
}
