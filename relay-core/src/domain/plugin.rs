//! Plugin step domain types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::domain::log::LogEntry;

/// A sandbox-executable code fragment bound to pipeline steps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginStep {
    pub id: Uuid,
    pub name: String,
    /// Lua source, run as a function body with `input` in scope
    pub code: String,
    /// Structural description of the expected input
    pub input_schema: JsonValue,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
}

/// Normalised outcome of one sandbox run
///
/// Serialises as `{success, output}` or `{success: false, error}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginRunResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub logs: Vec<LogEntry>,
}

impl PluginRunResult {
    pub fn succeeded(output: JsonValue, logs: Vec<LogEntry>) -> Self {
        Self {
            success: true,
            output: Some(output),
            error: None,
            logs,
        }
    }

    pub fn failed(error: impl Into<String>, logs: Vec<LogEntry>) -> Self {
        Self {
            success: false,
            output: None,
            error: Some(error.into()),
            logs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_result_shapes() {
        let ok = serde_json::to_value(PluginRunResult::succeeded(json!(3), Vec::new())).unwrap();
        assert_eq!(ok, json!({ "success": true, "output": 3 }));

        let err = serde_json::to_value(PluginRunResult::failed("boom", Vec::new())).unwrap();
        assert_eq!(err, json!({ "success": false, "error": "boom" }));
    }
}
