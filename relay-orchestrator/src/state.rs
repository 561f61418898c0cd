//! Shared application state
//!
//! Wires one store into every engine service and starts the execution queue.

use std::sync::Arc;

use relay_engine::EngineConfig;
use relay_engine::agent::AgentRunner;
use relay_engine::progress::ProgressNotifier;
use relay_engine::scheduler::{ExecutionQueue, SchedulerDispatcher};
use relay_engine::service::{
    AgentService, DelegationService, ExecutionEngine, PipelineService, PluginService,
    ScheduleService,
};
use relay_engine::store::{ExecutionStore, Store};
use tokio::task::JoinHandle;

#[derive(Clone)]
pub struct AppState {
    pub agents: Arc<AgentService>,
    pub pipelines: Arc<PipelineService>,
    pub plugins: Arc<PluginService>,
    pub schedules: Arc<ScheduleService>,
    pub delegation: Arc<DelegationService>,
    pub engine: Arc<ExecutionEngine>,
    pub queue: ExecutionQueue,
    pub dispatcher: Arc<SchedulerDispatcher>,
    pub notifier: ProgressNotifier,
}

impl AppState {
    /// Builds every service over `store` and starts the queue worker
    ///
    /// Must be called inside a Tokio runtime.
    pub fn build<S: Store + 'static>(
        store: Arc<S>,
        runner: Arc<dyn AgentRunner>,
        config: EngineConfig,
    ) -> (Self, JoinHandle<()>) {
        let executions: Arc<dyn ExecutionStore> = store.clone();
        let store: Arc<dyn Store> = store;

        let delegation = Arc::new(DelegationService::new(store.clone(), runner.clone()));
        let notifier = ProgressNotifier::new(executions, &config);
        let capacity = config.queue_capacity;
        let engine = Arc::new(ExecutionEngine::new(
            store.clone(),
            runner,
            delegation.clone(),
            config,
        ));
        let (queue, worker) = ExecutionQueue::start(engine.clone(), capacity);
        let dispatcher = Arc::new(SchedulerDispatcher::new(store.clone(), queue.clone()));

        let state = Self {
            agents: Arc::new(AgentService::new(store.clone())),
            pipelines: Arc::new(PipelineService::new(store.clone())),
            plugins: Arc::new(PluginService::new(store.clone())),
            schedules: Arc::new(ScheduleService::new(store)),
            delegation,
            engine,
            queue,
            dispatcher,
            notifier,
        };

        (state, worker)
    }
}
