//! In-memory store
//!
//! Implements every storage trait over `RwLock`ed maps. Used by the tests and
//! by the orchestrator when no `DATABASE_URL` is configured.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use relay_core::domain::agent::Agent;
use relay_core::domain::delegation::Delegation;
use relay_core::domain::execution::Execution;
use relay_core::domain::pipeline::Pipeline;
use relay_core::domain::plugin::PluginStep;
use relay_core::domain::schedule::Schedule;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    AgentStore, DelegationStore, ExecutionStore, PipelineStore, PluginStore, ScheduleStore,
    StoreError, StoreResult,
};

#[derive(Debug, Default)]
pub struct MemoryStore {
    executions: RwLock<HashMap<Uuid, Execution>>,
    pipelines: RwLock<HashMap<Uuid, Pipeline>>,
    agents: RwLock<HashMap<Uuid, Agent>>,
    delegations: RwLock<HashMap<Uuid, Delegation>>,
    schedules: RwLock<HashMap<Uuid, Schedule>>,
    plugins: RwLock<HashMap<Uuid, PluginStep>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn insert_new<T: Clone>(map: &mut HashMap<Uuid, T>, id: Uuid, value: &T) -> StoreResult<()> {
    if map.contains_key(&id) {
        return Err(StoreError::Conflict(format!("{} already exists", id)));
    }
    map.insert(id, value.clone());
    Ok(())
}

fn replace<T: Clone>(map: &mut HashMap<Uuid, T>, id: Uuid, value: &T) -> StoreResult<()> {
    match map.get_mut(&id) {
        Some(slot) => {
            *slot = value.clone();
            Ok(())
        }
        None => Err(StoreError::Conflict(format!("{} does not exist", id))),
    }
}

#[async_trait]
impl ExecutionStore for MemoryStore {
    async fn insert_execution(&self, execution: &Execution) -> StoreResult<()> {
        insert_new(&mut *self.executions.write().await, execution.id, execution)
    }

    async fn save_execution(&self, execution: &Execution) -> StoreResult<()> {
        let mut executions = self.executions.write().await;
        let share_token = executions
            .get(&execution.id)
            .and_then(|stored| stored.share_token.clone());

        let mut updated = execution.clone();
        updated.share_token = share_token;
        replace(&mut executions, execution.id, &updated)
    }

    async fn find_execution(&self, id: Uuid) -> StoreResult<Option<Execution>> {
        Ok(self.executions.read().await.get(&id).cloned())
    }

    async fn find_execution_by_share_token(&self, token: &str) -> StoreResult<Option<Execution>> {
        Ok(self
            .executions
            .read()
            .await
            .values()
            .find(|e| e.share_token.as_deref() == Some(token))
            .cloned())
    }

    async fn list_executions_for_pipeline(&self, pipeline_id: Uuid) -> StoreResult<Vec<Execution>> {
        let mut executions: Vec<Execution> = self
            .executions
            .read()
            .await
            .values()
            .filter(|e| e.pipeline_id == pipeline_id)
            .cloned()
            .collect();
        executions.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        Ok(executions)
    }

    async fn set_share_token(&self, id: Uuid, token: Option<String>) -> StoreResult<bool> {
        match self.executions.write().await.get_mut(&id) {
            Some(execution) => {
                execution.share_token = token;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl PipelineStore for MemoryStore {
    async fn insert_pipeline(&self, pipeline: &Pipeline) -> StoreResult<()> {
        insert_new(&mut *self.pipelines.write().await, pipeline.id, pipeline)
    }

    async fn find_pipeline(&self, id: Uuid) -> StoreResult<Option<Pipeline>> {
        Ok(self.pipelines.read().await.get(&id).cloned())
    }

    async fn list_pipelines(&self) -> StoreResult<Vec<Pipeline>> {
        let mut pipelines: Vec<Pipeline> = self.pipelines.read().await.values().cloned().collect();
        pipelines.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(pipelines)
    }

    async fn set_pipeline_active(&self, id: Uuid, active: bool) -> StoreResult<bool> {
        match self.pipelines.write().await.get_mut(&id) {
            Some(pipeline) => {
                pipeline.is_active = active;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_pipeline(&self, id: Uuid) -> StoreResult<bool> {
        Ok(self.pipelines.write().await.remove(&id).is_some())
    }

    async fn list_cron_pipelines(&self) -> StoreResult<Vec<Pipeline>> {
        Ok(self
            .pipelines
            .read()
            .await
            .values()
            .filter(|p| p.is_active && p.cron_expression.is_some())
            .cloned()
            .collect())
    }
}

#[async_trait]
impl AgentStore for MemoryStore {
    async fn insert_agent(&self, agent: &Agent) -> StoreResult<()> {
        insert_new(&mut *self.agents.write().await, agent.id, agent)
    }

    async fn find_agent(&self, id: Uuid) -> StoreResult<Option<Agent>> {
        Ok(self.agents.read().await.get(&id).cloned())
    }

    async fn list_agents(&self) -> StoreResult<Vec<Agent>> {
        let mut agents: Vec<Agent> = self.agents.read().await.values().cloned().collect();
        agents.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(agents)
    }

    async fn set_agent_enabled(&self, id: Uuid, enabled: bool) -> StoreResult<bool> {
        match self.agents.write().await.get_mut(&id) {
            Some(agent) => {
                agent.enabled = enabled;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl DelegationStore for MemoryStore {
    async fn insert_delegation(&self, delegation: &Delegation) -> StoreResult<()> {
        insert_new(&mut *self.delegations.write().await, delegation.id, delegation)
    }

    async fn save_delegation(&self, delegation: &Delegation) -> StoreResult<()> {
        replace(&mut *self.delegations.write().await, delegation.id, delegation)
    }

    async fn list_delegations_for_agent(&self, agent_id: Uuid) -> StoreResult<Vec<Delegation>> {
        let mut delegations: Vec<Delegation> = self
            .delegations
            .read()
            .await
            .values()
            .filter(|d| d.from_agent_id == agent_id || d.to_agent_id == agent_id)
            .cloned()
            .collect();
        delegations.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(delegations)
    }
}

#[async_trait]
impl ScheduleStore for MemoryStore {
    async fn insert_schedule(&self, schedule: &Schedule) -> StoreResult<()> {
        insert_new(&mut *self.schedules.write().await, schedule.id, schedule)
    }

    async fn save_schedule(&self, schedule: &Schedule) -> StoreResult<()> {
        replace(&mut *self.schedules.write().await, schedule.id, schedule)
    }

    async fn find_schedule(&self, id: Uuid) -> StoreResult<Option<Schedule>> {
        Ok(self.schedules.read().await.get(&id).cloned())
    }

    async fn list_schedules(&self) -> StoreResult<Vec<Schedule>> {
        let mut schedules: Vec<Schedule> = self.schedules.read().await.values().cloned().collect();
        schedules.sort_by(|a, b| a.next_run_at.cmp(&b.next_run_at));
        Ok(schedules)
    }

    async fn list_due_schedules(&self, now: DateTime<Utc>) -> StoreResult<Vec<Schedule>> {
        let mut due: Vec<Schedule> = self
            .schedules
            .read()
            .await
            .values()
            .filter(|s| s.is_due(now))
            .cloned()
            .collect();
        due.sort_by(|a, b| a.next_run_at.cmp(&b.next_run_at));
        Ok(due)
    }

    async fn claim_schedule(
        &self,
        id: Uuid,
        expected: DateTime<Utc>,
        next_run_at: DateTime<Utc>,
        fired_at: DateTime<Utc>,
    ) -> StoreResult<bool> {
        let mut schedules = self.schedules.write().await;
        match schedules.get_mut(&id) {
            Some(schedule) if schedule.next_run_at == expected => {
                schedule.next_run_at = next_run_at;
                schedule.last_run_at = Some(fired_at);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn repoint_schedules(&self, from: Uuid, to: Uuid) -> StoreResult<u64> {
        let mut moved = 0;
        for schedule in self.schedules.write().await.values_mut() {
            if schedule.pipeline_id == from {
                schedule.pipeline_id = to;
                moved += 1;
            }
        }
        Ok(moved)
    }

    async fn delete_schedule(&self, id: Uuid) -> StoreResult<bool> {
        Ok(self.schedules.write().await.remove(&id).is_some())
    }
}

#[async_trait]
impl PluginStore for MemoryStore {
    async fn insert_plugin(&self, plugin: &PluginStep) -> StoreResult<()> {
        insert_new(&mut *self.plugins.write().await, plugin.id, plugin)
    }

    async fn save_plugin(&self, plugin: &PluginStep) -> StoreResult<()> {
        replace(&mut *self.plugins.write().await, plugin.id, plugin)
    }

    async fn find_plugin(&self, id: Uuid) -> StoreResult<Option<PluginStep>> {
        Ok(self.plugins.read().await.get(&id).cloned())
    }

    async fn list_plugins(&self) -> StoreResult<Vec<PluginStep>> {
        let mut plugins: Vec<PluginStep> = self.plugins.read().await.values().cloned().collect();
        plugins.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(plugins)
    }
}
