//! Pipeline-related API endpoints

use crate::OrchestratorClient;
use crate::error::Result;
use relay_core::domain::pipeline::Pipeline;
use relay_core::dto::pipeline::CreatePipeline;
use uuid::Uuid;

impl OrchestratorClient {
    /// Create a new pipeline
    pub async fn create_pipeline(&self, req: &CreatePipeline) -> Result<Pipeline> {
        self.post("/pipelines", req).await
    }

    /// Store `req` as the next version of `pipeline_id`
    ///
    /// The previous version is deactivated by the orchestrator.
    pub async fn create_pipeline_version(
        &self,
        pipeline_id: Uuid,
        req: &CreatePipeline,
    ) -> Result<Pipeline> {
        self.post(&format!("/pipelines/{}/versions", pipeline_id), req)
            .await
    }

    /// List all pipelines
    pub async fn list_pipelines(&self) -> Result<Vec<Pipeline>> {
        self.get("/pipelines").await
    }

    /// Get a pipeline by ID
    pub async fn get_pipeline(&self, pipeline_id: Uuid) -> Result<Pipeline> {
        self.get(&format!("/pipelines/{}", pipeline_id)).await
    }

    /// Delete a pipeline
    pub async fn delete_pipeline(&self, pipeline_id: Uuid) -> Result<()> {
        self.delete(&format!("/pipelines/{}", pipeline_id)).await
    }
}
