//! Agent and delegation endpoints

use crate::OrchestratorClient;
use crate::error::Result;
use relay_core::domain::agent::Agent;
use relay_core::domain::delegation::Delegation;
use relay_core::dto::agent::{CreateAgent, SetAgentEnabled};
use relay_core::dto::delegation::{DelegateRequest, DelegateResponse};
use uuid::Uuid;

impl OrchestratorClient {
    pub async fn create_agent(&self, req: &CreateAgent) -> Result<Agent> {
        self.post("/agents", req).await
    }

    pub async fn list_agents(&self) -> Result<Vec<Agent>> {
        self.get("/agents").await
    }

    pub async fn get_agent(&self, agent_id: Uuid) -> Result<Agent> {
        self.get(&format!("/agents/{}", agent_id)).await
    }

    pub async fn set_agent_enabled(&self, agent_id: Uuid, enabled: bool) -> Result<Agent> {
        self.post(
            &format!("/agents/{}/enabled", agent_id),
            &SetAgentEnabled { enabled },
        )
        .await
    }

    /// Delegations sent or received by an agent, newest first
    pub async fn list_delegations(&self, agent_id: Uuid) -> Result<Vec<Delegation>> {
        self.get(&format!("/agents/{}/delegations", agent_id)).await
    }

    /// Manual delegation; refusals come back as response text
    pub async fn delegate(&self, req: &DelegateRequest) -> Result<DelegateResponse> {
        self.post("/delegations", req).await
    }
}
