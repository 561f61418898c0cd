//! Plugin step endpoints

use crate::OrchestratorClient;
use crate::error::Result;
use relay_core::domain::plugin::{PluginRunResult, PluginStep};
use relay_core::dto::plugin::{
    CreatePlugin, RunPlugin, UpdatePlugin, ValidatePlugin, ValidationReport,
};
use serde_json::Value as JsonValue;
use uuid::Uuid;

impl OrchestratorClient {
    pub async fn create_plugin(&self, req: &CreatePlugin) -> Result<PluginStep> {
        self.post("/plugins", req).await
    }

    pub async fn list_plugins(&self) -> Result<Vec<PluginStep>> {
        self.get("/plugins").await
    }

    pub async fn get_plugin(&self, plugin_id: Uuid) -> Result<PluginStep> {
        self.get(&format!("/plugins/{}", plugin_id)).await
    }

    pub async fn update_plugin(&self, plugin_id: Uuid, req: &UpdatePlugin) -> Result<PluginStep> {
        self.put(&format!("/plugins/{}", plugin_id), req).await
    }

    /// Server-side parse-only check
    pub async fn validate_plugin(&self, code: impl Into<String>) -> Result<ValidationReport> {
        self.post("/plugins/validate", &ValidatePlugin { code: code.into() })
            .await
    }

    pub async fn run_plugin(&self, plugin_id: Uuid, input: JsonValue) -> Result<PluginRunResult> {
        self.post(&format!("/plugins/{}/run", plugin_id), &RunPlugin { input })
            .await
    }
}
