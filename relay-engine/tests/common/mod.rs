#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use relay_core::domain::agent::Agent;
use relay_core::domain::execution::Execution;
use relay_core::domain::pipeline::{Pipeline, PipelineStep, Strategy};
use relay_engine::EngineConfig;
use relay_engine::agent::{AgentError, AgentInvocation, AgentReply, AgentRunner, TokenUsage};
use relay_engine::service::{DelegationService, ExecutionEngine};
use relay_engine::store::{ExecutionStore, MemoryStore, Store};
use uuid::Uuid;

type Responder = Box<dyn Fn(&AgentInvocation) -> Result<AgentReply, AgentError> + Send + Sync>;

/// Agent runner that answers from a closure and records every call
pub struct ScriptedRunner {
    responder: Responder,
    calls: Mutex<Vec<AgentInvocation>>,
}

impl ScriptedRunner {
    pub fn new(
        responder: impl Fn(&AgentInvocation) -> Result<AgentReply, AgentError> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            responder: Box::new(responder),
            calls: Mutex::new(Vec::new()),
        })
    }

    /// Replies "Output from <model>. More detail here."
    pub fn by_model() -> Arc<Self> {
        Self::new(|inv| Ok(reply(format!("Output from {}. More detail here.", inv.model))))
    }

    pub fn calls(&self) -> Vec<AgentInvocation> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl AgentRunner for ScriptedRunner {
    async fn run(&self, invocation: AgentInvocation) -> Result<AgentReply, AgentError> {
        self.calls.lock().unwrap().push(invocation.clone());
        (self.responder)(&invocation)
    }
}

pub fn reply(text: impl Into<String>) -> AgentReply {
    AgentReply {
        text: text.into(),
        usage: TokenUsage {
            input_tokens: 10,
            output_tokens: 5,
        },
        delegations: Vec::new(),
    }
}

pub fn test_config() -> EngineConfig {
    EngineConfig {
        progress_poll_interval: Duration::from_millis(10),
        ..EngineConfig::default()
    }
}

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub engine: Arc<ExecutionEngine>,
    pub delegation: Arc<DelegationService>,
}

pub fn harness(runner: Arc<dyn AgentRunner>) -> Harness {
    let store = Arc::new(MemoryStore::new());
    let dyn_store: Arc<dyn Store> = store.clone();
    let delegation = Arc::new(DelegationService::new(dyn_store.clone(), runner.clone()));
    let engine = Arc::new(ExecutionEngine::new(
        dyn_store,
        runner,
        delegation.clone(),
        test_config(),
    ));

    Harness {
        store,
        engine,
        delegation,
    }
}

pub async fn seed_agent(store: &MemoryStore, name: &str, enabled: bool) -> Agent {
    use relay_engine::store::AgentStore;

    let agent = Agent {
        id: Uuid::new_v4(),
        name: name.to_string(),
        owner_id: "owner-1".to_string(),
        model: format!("{}-model", name.to_lowercase()),
        instructions: format!("You are the {}.", name),
        enabled,
        created_at: Utc::now(),
    };
    store.insert_agent(&agent).await.unwrap();
    agent
}

pub fn agent_step(agent: &Agent, role: &str) -> PipelineStep {
    PipelineStep::Agent {
        id: role.to_lowercase(),
        agent_id: agent.id,
        role: role.to_string(),
        prompt: None,
    }
}

pub async fn seed_pipeline(
    store: &MemoryStore,
    strategy: Strategy,
    steps: Vec<PipelineStep>,
) -> Pipeline {
    seed_cron_pipeline(store, strategy, steps, None).await
}

pub async fn seed_cron_pipeline(
    store: &MemoryStore,
    strategy: Strategy,
    steps: Vec<PipelineStep>,
    cron_expression: Option<&str>,
) -> Pipeline {
    use relay_engine::store::PipelineStore;

    let pipeline = Pipeline {
        id: Uuid::new_v4(),
        name: "launch".to_string(),
        description: None,
        owner_id: "owner-1".to_string(),
        strategy,
        steps,
        cron_expression: cron_expression.map(str::to_string),
        is_active: true,
        version: 1,
        created_at: Utc::now(),
    };
    store.insert_pipeline(&pipeline).await.unwrap();
    pipeline
}

/// Polls until the execution is terminal or two seconds pass
pub async fn wait_terminal(store: &MemoryStore, id: Uuid) -> Execution {
    for _ in 0..200 {
        if let Some(execution) = store.find_execution(id).await.unwrap() {
            if execution.status.is_terminal() {
                return execution;
            }
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("execution {} did not finish", id);
}
