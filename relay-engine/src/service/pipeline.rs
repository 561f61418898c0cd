//! Pipeline service
//!
//! Validates step configuration at the edit boundary. Pipelines are
//! immutable; a new version is a new record.

use std::sync::Arc;

use chrono::Utc;
use relay_core::cron;
use relay_core::domain::pipeline::{Pipeline, PipelineStep, validate_steps};
use relay_core::dto::pipeline::CreatePipeline;
use tracing::info;
use uuid::Uuid;

use crate::error::EngineError;
use crate::store::Store;

pub struct PipelineService {
    store: Arc<dyn Store>,
}

impl PipelineService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn create(&self, req: CreatePipeline) -> Result<Pipeline, EngineError> {
        self.validate(&req).await?;

        let pipeline = build(req, 1);
        self.store.insert_pipeline(&pipeline).await?;

        info!("Pipeline created: {} ({})", pipeline.name, pipeline.id);
        Ok(pipeline)
    }

    /// Stores `req` as the next version of `id` and deactivates `id`
    ///
    /// Schedules of the previous version follow it to the new one.
    pub async fn new_version(&self, id: Uuid, req: CreatePipeline) -> Result<Pipeline, EngineError> {
        let previous = self.get(id).await?;
        self.validate(&req).await?;

        let pipeline = build(req, previous.version + 1);
        self.store.insert_pipeline(&pipeline).await?;
        let moved = self.store.repoint_schedules(previous.id, pipeline.id).await?;
        self.store.set_pipeline_active(previous.id, false).await?;

        info!(
            "Pipeline {} superseded by {} (v{}, {} schedule(s) moved)",
            previous.id, pipeline.id, pipeline.version, moved
        );
        Ok(pipeline)
    }

    pub async fn get(&self, id: Uuid) -> Result<Pipeline, EngineError> {
        self.store
            .find_pipeline(id)
            .await?
            .ok_or_else(|| EngineError::not_found("pipeline", id))
    }

    pub async fn list(&self) -> Result<Vec<Pipeline>, EngineError> {
        Ok(self.store.list_pipelines().await?)
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), EngineError> {
        if !self.store.delete_pipeline(id).await? {
            return Err(EngineError::not_found("pipeline", id));
        }
        info!("Pipeline deleted: {}", id);
        Ok(())
    }

    async fn validate(&self, req: &CreatePipeline) -> Result<(), EngineError> {
        if req.name.trim().is_empty() {
            return Err(EngineError::Validation("pipeline name cannot be empty".to_string()));
        }

        validate_steps(&req.steps).map_err(|e| EngineError::Validation(e.to_string()))?;

        if let Some(expr) = &req.cron_expression {
            cron::validate(expr).map_err(|e| EngineError::Validation(e.to_string()))?;
        }

        for step in &req.steps {
            match step {
                PipelineStep::Agent { id, agent_id, .. } => {
                    if self.store.find_agent(*agent_id).await?.is_none() {
                        return Err(EngineError::Validation(format!(
                            "step '{}' references unknown agent {}",
                            id, agent_id
                        )));
                    }
                }
                PipelineStep::Plugin { id, plugin_id, .. } => {
                    if self.store.find_plugin(*plugin_id).await?.is_none() {
                        return Err(EngineError::Validation(format!(
                            "step '{}' references unknown plugin {}",
                            id, plugin_id
                        )));
                    }
                }
            }
        }

        Ok(())
    }
}

fn build(req: CreatePipeline, version: u32) -> Pipeline {
    Pipeline {
        id: Uuid::new_v4(),
        name: req.name,
        description: req.description,
        owner_id: req.owner_id,
        strategy: req.strategy,
        steps: req.steps,
        cron_expression: req.cron_expression,
        is_active: req.is_active,
        version,
        created_at: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::AgentService;
    use crate::store::MemoryStore;
    use relay_core::domain::pipeline::Strategy;
    use relay_core::dto::agent::CreateAgent;

    async fn fixture() -> (PipelineService, Uuid) {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let agent = AgentService::new(store.clone())
            .create(CreateAgent {
                name: "Writer".to_string(),
                owner_id: "owner-1".to_string(),
                model: "writer-model".to_string(),
                instructions: String::new(),
                enabled: true,
            })
            .await
            .unwrap();
        (PipelineService::new(store), agent.id)
    }

    fn request(agent_id: Uuid) -> CreatePipeline {
        CreatePipeline {
            name: "launch-copy".to_string(),
            description: None,
            owner_id: "owner-1".to_string(),
            strategy: Strategy::Sequential,
            steps: vec![PipelineStep::Agent {
                id: "write".to_string(),
                agent_id,
                role: "Writer".to_string(),
                prompt: None,
            }],
            cron_expression: None,
            is_active: true,
        }
    }

    #[tokio::test]
    async fn test_create_valid_pipeline() {
        let (service, agent_id) = fixture().await;

        let pipeline = service.create(request(agent_id)).await.unwrap();

        assert_eq!(pipeline.version, 1);
        assert!(pipeline.is_active);
        assert_eq!(service.get(pipeline.id).await.unwrap(), pipeline);
    }

    #[tokio::test]
    async fn test_validate_empty_name() {
        let (service, agent_id) = fixture().await;
        let mut req = request(agent_id);
        req.name = "  ".to_string();

        let result = service.create(req).await;
        assert!(matches!(result, Err(EngineError::Validation(_))));
    }

    #[tokio::test]
    async fn test_validate_unknown_agent() {
        let (service, _) = fixture().await;

        let result = service.create(request(Uuid::new_v4())).await;
        match result {
            Err(EngineError::Validation(message)) => assert!(message.contains("unknown agent")),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_validate_cron_expression() {
        let (service, agent_id) = fixture().await;
        let mut req = request(agent_id);
        req.cron_expression = Some("every morning".to_string());

        let result = service.create(req).await;
        assert!(matches!(result, Err(EngineError::Validation(_))));
    }

    #[tokio::test]
    async fn test_new_version_deactivates_previous() {
        let (service, agent_id) = fixture().await;
        let first = service.create(request(agent_id)).await.unwrap();

        let second = service.new_version(first.id, request(agent_id)).await.unwrap();

        assert_eq!(second.version, 2);
        assert_ne!(second.id, first.id);
        assert!(second.is_active);
        assert!(!service.get(first.id).await.unwrap().is_active);
    }

    #[tokio::test]
    async fn test_delete_unknown_pipeline() {
        let (service, _) = fixture().await;

        let result = service.delete(Uuid::new_v4()).await;
        assert!(matches!(result, Err(EngineError::NotFound(_))));
    }
}
