//! Storage layer
//!
//! The engine talks to persistence only through these traits. The
//! orchestrator provides a PostgreSQL implementation; [`MemoryStore`] backs
//! tests and database-less runs.
//!
//! All repositories are trait-based to enable testing and mocking.

mod memory;
#[cfg(test)]
pub(crate) mod testing;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use relay_core::domain::agent::Agent;
use relay_core::domain::delegation::Delegation;
use relay_core::domain::execution::Execution;
use relay_core::domain::pipeline::Pipeline;
use relay_core::domain::plugin::PluginStep;
use relay_core::domain::schedule::Schedule;
use thiserror::Error;
use uuid::Uuid;

pub use memory::MemoryStore;

/// Storage failure
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("stored value could not be (de)serialized: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("conflict: {0}")]
    Conflict(String),
}

impl StoreError {
    pub fn backend(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        StoreError::Backend(Box::new(err))
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Execution records
///
/// The execution engine is the only writer; everything else reads.
#[async_trait]
pub trait ExecutionStore: Send + Sync {
    async fn insert_execution(&self, execution: &Execution) -> StoreResult<()>;

    /// Overwrites status, output and step results
    ///
    /// The share token is left as stored; it only changes through
    /// [`ExecutionStore::set_share_token`].
    async fn save_execution(&self, execution: &Execution) -> StoreResult<()>;

    async fn find_execution(&self, id: Uuid) -> StoreResult<Option<Execution>>;

    async fn find_execution_by_share_token(&self, token: &str) -> StoreResult<Option<Execution>>;

    /// Newest first
    async fn list_executions_for_pipeline(&self, pipeline_id: Uuid) -> StoreResult<Vec<Execution>>;

    /// Returns false if the execution does not exist
    async fn set_share_token(&self, id: Uuid, token: Option<String>) -> StoreResult<bool>;
}

#[async_trait]
pub trait PipelineStore: Send + Sync {
    async fn insert_pipeline(&self, pipeline: &Pipeline) -> StoreResult<()>;

    async fn find_pipeline(&self, id: Uuid) -> StoreResult<Option<Pipeline>>;

    async fn list_pipelines(&self) -> StoreResult<Vec<Pipeline>>;

    async fn set_pipeline_active(&self, id: Uuid, active: bool) -> StoreResult<bool>;

    async fn delete_pipeline(&self, id: Uuid) -> StoreResult<bool>;

    /// Active pipelines carrying a cron expression
    async fn list_cron_pipelines(&self) -> StoreResult<Vec<Pipeline>>;
}

#[async_trait]
pub trait AgentStore: Send + Sync {
    async fn insert_agent(&self, agent: &Agent) -> StoreResult<()>;

    async fn find_agent(&self, id: Uuid) -> StoreResult<Option<Agent>>;

    async fn list_agents(&self) -> StoreResult<Vec<Agent>>;

    async fn set_agent_enabled(&self, id: Uuid, enabled: bool) -> StoreResult<bool>;
}

/// Delegation audit records, never deleted
#[async_trait]
pub trait DelegationStore: Send + Sync {
    async fn insert_delegation(&self, delegation: &Delegation) -> StoreResult<()>;

    async fn save_delegation(&self, delegation: &Delegation) -> StoreResult<()>;

    /// Delegations sent or received by an agent, newest first
    async fn list_delegations_for_agent(&self, agent_id: Uuid) -> StoreResult<Vec<Delegation>>;
}

#[async_trait]
pub trait ScheduleStore: Send + Sync {
    async fn insert_schedule(&self, schedule: &Schedule) -> StoreResult<()>;

    async fn save_schedule(&self, schedule: &Schedule) -> StoreResult<()>;

    async fn find_schedule(&self, id: Uuid) -> StoreResult<Option<Schedule>>;

    async fn list_schedules(&self) -> StoreResult<Vec<Schedule>>;

    /// Active schedules with `next_run_at <= now`
    async fn list_due_schedules(&self, now: DateTime<Utc>) -> StoreResult<Vec<Schedule>>;

    /// Records a firing, but only if `next_run_at` still equals `expected`
    ///
    /// Returns false when another dispatcher advanced the schedule first;
    /// the caller must not fire it.
    async fn claim_schedule(
        &self,
        id: Uuid,
        expected: DateTime<Utc>,
        next_run_at: DateTime<Utc>,
        fired_at: DateTime<Utc>,
    ) -> StoreResult<bool>;

    /// Points every schedule of `from` at `to`, returning how many moved
    async fn repoint_schedules(&self, from: Uuid, to: Uuid) -> StoreResult<u64>;

    async fn delete_schedule(&self, id: Uuid) -> StoreResult<bool>;
}

#[async_trait]
pub trait PluginStore: Send + Sync {
    async fn insert_plugin(&self, plugin: &PluginStep) -> StoreResult<()>;

    async fn save_plugin(&self, plugin: &PluginStep) -> StoreResult<()>;

    async fn find_plugin(&self, id: Uuid) -> StoreResult<Option<PluginStep>>;

    async fn list_plugins(&self) -> StoreResult<Vec<PluginStep>>;
}

/// Everything the engine persists
pub trait Store:
    ExecutionStore + PipelineStore + AgentStore + DelegationStore + ScheduleStore + PluginStore
{
}

impl<T> Store for T where
    T: ExecutionStore + PipelineStore + AgentStore + DelegationStore + ScheduleStore + PluginStore
{
}
