//! Service layer
//!
//! Services contain the engine's business logic. They orchestrate
//! operations over the storage traits and the agent runner:
//! - Execution: the pipeline state machine
//! - Delegation: bounded agent-to-agent hand-offs
//! - Pipeline, agent, schedule and plugin management with edit-time validation

mod agent;
mod delegation;
mod execution;
mod pipeline;
mod plugin;
mod schedule;

pub use agent::AgentService;
pub use delegation::{DelegationRequest, DelegationService, MAX_DELEGATION_DEPTH, annotate};
pub use execution::{
    ExecutionEngine, compose_prompt, final_instructions, input_text, shape_final_output,
};
pub use pipeline::PipelineService;
pub use plugin::{PluginService, validate_code};
pub use schedule::ScheduleService;
