//! Execution endpoints

use crate::OrchestratorClient;
use crate::error::Result;
use relay_core::domain::execution::Execution;
use relay_core::dto::execution::{ShareLink, TriggerExecution};
use serde_json::Value as JsonValue;
use uuid::Uuid;

impl OrchestratorClient {
    /// Queue a run of a pipeline
    ///
    /// Returns the pending execution as soon as it is queued.
    pub async fn trigger_execution(&self, pipeline_id: Uuid, input: JsonValue) -> Result<Execution> {
        self.post(
            &format!("/pipelines/{}/executions", pipeline_id),
            &TriggerExecution { input },
        )
        .await
    }

    /// Executions of a pipeline, newest first
    pub async fn list_executions(&self, pipeline_id: Uuid) -> Result<Vec<Execution>> {
        self.get(&format!("/pipelines/{}/executions", pipeline_id))
            .await
    }

    pub async fn get_execution(&self, execution_id: Uuid) -> Result<Execution> {
        self.get(&format!("/executions/{}", execution_id)).await
    }

    /// Ask a running execution to stop before its next step
    pub async fn cancel_execution(&self, execution_id: Uuid) -> Result<()> {
        self.post_empty(&format!("/executions/{}/cancel", execution_id))
            .await
    }

    pub async fn share_execution(&self, execution_id: Uuid) -> Result<ShareLink> {
        self.post(&format!("/executions/{}/share", execution_id), &())
            .await
    }

    pub async fn unshare_execution(&self, execution_id: Uuid) -> Result<()> {
        self.delete(&format!("/executions/{}/share", execution_id))
            .await
    }

    /// Read-only view through a share token
    pub async fn get_shared_execution(&self, token: &str) -> Result<Execution> {
        self.get(&format!("/shared/{}", token)).await
    }
}
