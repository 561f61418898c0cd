//! Execution DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::domain::execution::{Execution, ExecutionStatus, StepResult};

/// Request to trigger a pipeline execution
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TriggerExecution {
    #[serde(default)]
    pub input: JsonValue,
}

/// Payload of an `execution-update` progress event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionUpdate {
    pub status: ExecutionStatus,
    pub current_step_id: Option<String>,
    pub step_results: Vec<StepResult>,
    pub output: Option<JsonValue>,
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<&Execution> for ExecutionUpdate {
    fn from(execution: &Execution) -> Self {
        Self {
            status: execution.status,
            current_step_id: execution.current_step_id.clone(),
            step_results: execution.step_results.clone(),
            output: execution.output.clone(),
            error: execution.error.clone(),
            started_at: execution.started_at,
            completed_at: execution.completed_at,
        }
    }
}

/// Public read-only link token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShareLink {
    pub token: String,
}
