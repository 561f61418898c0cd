//! Agent registry service

use std::sync::Arc;

use chrono::Utc;
use relay_core::domain::agent::Agent;
use relay_core::domain::delegation::Delegation;
use relay_core::dto::agent::CreateAgent;
use tracing::info;
use uuid::Uuid;

use crate::error::EngineError;
use crate::store::Store;

pub struct AgentService {
    store: Arc<dyn Store>,
}

impl AgentService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn create(&self, req: CreateAgent) -> Result<Agent, EngineError> {
        if req.name.trim().is_empty() {
            return Err(EngineError::Validation("agent name cannot be empty".to_string()));
        }
        if req.model.trim().is_empty() {
            return Err(EngineError::Validation("agent model cannot be empty".to_string()));
        }

        let agent = Agent {
            id: Uuid::new_v4(),
            name: req.name,
            owner_id: req.owner_id,
            model: req.model,
            instructions: req.instructions,
            enabled: req.enabled,
            created_at: Utc::now(),
        };
        self.store.insert_agent(&agent).await?;

        info!("Agent created: {} ({})", agent.name, agent.id);
        Ok(agent)
    }

    pub async fn get(&self, id: Uuid) -> Result<Agent, EngineError> {
        self.store
            .find_agent(id)
            .await?
            .ok_or_else(|| EngineError::not_found("agent", id))
    }

    pub async fn list(&self) -> Result<Vec<Agent>, EngineError> {
        Ok(self.store.list_agents().await?)
    }

    pub async fn set_enabled(&self, id: Uuid, enabled: bool) -> Result<Agent, EngineError> {
        if !self.store.set_agent_enabled(id, enabled).await? {
            return Err(EngineError::not_found("agent", id));
        }
        info!("Agent {} {}", id, if enabled { "enabled" } else { "disabled" });
        self.get(id).await
    }

    /// Delegations sent or received by the agent
    pub async fn delegations(&self, id: Uuid) -> Result<Vec<Delegation>, EngineError> {
        self.get(id).await?;
        Ok(self.store.list_delegations_for_agent(id).await?)
    }
}
