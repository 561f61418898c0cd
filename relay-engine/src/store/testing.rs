//! Store wrapper with injectable faults for unit tests

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use relay_core::domain::agent::Agent;
use relay_core::domain::delegation::Delegation;
use relay_core::domain::execution::Execution;
use relay_core::domain::pipeline::Pipeline;
use relay_core::domain::plugin::PluginStep;
use relay_core::domain::schedule::Schedule;
use uuid::Uuid;

use super::{
    AgentStore, DelegationStore, ExecutionStore, MemoryStore, PipelineStore, PluginStore,
    ScheduleStore, StoreError, StoreResult,
};

/// Delegates to a [`MemoryStore`] unless a fault is armed
#[derive(Default)]
pub struct FaultyStore {
    pub inner: MemoryStore,
    failing_cron_loads: AtomicUsize,
    stale_execution: Mutex<Option<Execution>>,
}

impl FaultyStore {
    /// Makes the next `n` cron pipeline loads fail
    pub fn fail_cron_loads(&self, n: usize) {
        self.failing_cron_loads.store(n, Ordering::SeqCst);
    }

    /// The next `find_execution` for this id returns `snapshot`
    pub fn serve_stale(&self, snapshot: Execution) {
        *self.stale_execution.lock().unwrap() = Some(snapshot);
    }
}

fn injected() -> StoreError {
    StoreError::Conflict("injected failure".to_string())
}

#[async_trait]
impl ExecutionStore for FaultyStore {
    async fn insert_execution(&self, execution: &Execution) -> StoreResult<()> {
        self.inner.insert_execution(execution).await
    }

    async fn save_execution(&self, execution: &Execution) -> StoreResult<()> {
        self.inner.save_execution(execution).await
    }

    async fn find_execution(&self, id: Uuid) -> StoreResult<Option<Execution>> {
        {
            let mut stale = self.stale_execution.lock().unwrap();
            if stale.as_ref().is_some_and(|e| e.id == id) {
                return Ok(stale.take());
            }
        }
        self.inner.find_execution(id).await
    }

    async fn find_execution_by_share_token(&self, token: &str) -> StoreResult<Option<Execution>> {
        self.inner.find_execution_by_share_token(token).await
    }

    async fn list_executions_for_pipeline(&self, pipeline_id: Uuid) -> StoreResult<Vec<Execution>> {
        self.inner.list_executions_for_pipeline(pipeline_id).await
    }

    async fn set_share_token(&self, id: Uuid, token: Option<String>) -> StoreResult<bool> {
        self.inner.set_share_token(id, token).await
    }
}

#[async_trait]
impl PipelineStore for FaultyStore {
    async fn insert_pipeline(&self, pipeline: &Pipeline) -> StoreResult<()> {
        self.inner.insert_pipeline(pipeline).await
    }

    async fn find_pipeline(&self, id: Uuid) -> StoreResult<Option<Pipeline>> {
        self.inner.find_pipeline(id).await
    }

    async fn list_pipelines(&self) -> StoreResult<Vec<Pipeline>> {
        self.inner.list_pipelines().await
    }

    async fn set_pipeline_active(&self, id: Uuid, active: bool) -> StoreResult<bool> {
        self.inner.set_pipeline_active(id, active).await
    }

    async fn delete_pipeline(&self, id: Uuid) -> StoreResult<bool> {
        self.inner.delete_pipeline(id).await
    }

    async fn list_cron_pipelines(&self) -> StoreResult<Vec<Pipeline>> {
        let armed = self
            .failing_cron_loads
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if armed {
            return Err(injected());
        }
        self.inner.list_cron_pipelines().await
    }
}

#[async_trait]
impl AgentStore for FaultyStore {
    async fn insert_agent(&self, agent: &Agent) -> StoreResult<()> {
        self.inner.insert_agent(agent).await
    }

    async fn find_agent(&self, id: Uuid) -> StoreResult<Option<Agent>> {
        self.inner.find_agent(id).await
    }

    async fn list_agents(&self) -> StoreResult<Vec<Agent>> {
        self.inner.list_agents().await
    }

    async fn set_agent_enabled(&self, id: Uuid, enabled: bool) -> StoreResult<bool> {
        self.inner.set_agent_enabled(id, enabled).await
    }
}

#[async_trait]
impl DelegationStore for FaultyStore {
    async fn insert_delegation(&self, delegation: &Delegation) -> StoreResult<()> {
        self.inner.insert_delegation(delegation).await
    }

    async fn save_delegation(&self, delegation: &Delegation) -> StoreResult<()> {
        self.inner.save_delegation(delegation).await
    }

    async fn list_delegations_for_agent(&self, agent_id: Uuid) -> StoreResult<Vec<Delegation>> {
        self.inner.list_delegations_for_agent(agent_id).await
    }
}

#[async_trait]
impl ScheduleStore for FaultyStore {
    async fn insert_schedule(&self, schedule: &Schedule) -> StoreResult<()> {
        self.inner.insert_schedule(schedule).await
    }

    async fn save_schedule(&self, schedule: &Schedule) -> StoreResult<()> {
        self.inner.save_schedule(schedule).await
    }

    async fn find_schedule(&self, id: Uuid) -> StoreResult<Option<Schedule>> {
        self.inner.find_schedule(id).await
    }

    async fn list_schedules(&self) -> StoreResult<Vec<Schedule>> {
        self.inner.list_schedules().await
    }

    async fn list_due_schedules(&self, now: DateTime<Utc>) -> StoreResult<Vec<Schedule>> {
        self.inner.list_due_schedules(now).await
    }

    async fn claim_schedule(
        &self,
        id: Uuid,
        expected: DateTime<Utc>,
        next_run_at: DateTime<Utc>,
        fired_at: DateTime<Utc>,
    ) -> StoreResult<bool> {
        self.inner
            .claim_schedule(id, expected, next_run_at, fired_at)
            .await
    }

    async fn repoint_schedules(&self, from: Uuid, to: Uuid) -> StoreResult<u64> {
        self.inner.repoint_schedules(from, to).await
    }

    async fn delete_schedule(&self, id: Uuid) -> StoreResult<bool> {
        self.inner.delete_schedule(id).await
    }
}

#[async_trait]
impl PluginStore for FaultyStore {
    async fn insert_plugin(&self, plugin: &PluginStep) -> StoreResult<()> {
        self.inner.insert_plugin(plugin).await
    }

    async fn save_plugin(&self, plugin: &PluginStep) -> StoreResult<()> {
        self.inner.save_plugin(plugin).await
    }

    async fn find_plugin(&self, id: Uuid) -> StoreResult<Option<PluginStep>> {
        self.inner.find_plugin(id).await
    }

    async fn list_plugins(&self) -> StoreResult<Vec<PluginStep>> {
        self.inner.list_plugins().await
    }
}
