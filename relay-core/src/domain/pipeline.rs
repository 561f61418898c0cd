//! Pipeline domain types

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;
use uuid::Uuid;

/// Pipeline definition
///
/// Immutable once created. A changed definition is stored as a new pipeline
/// with `version + 1`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pipeline {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub owner_id: String,
    pub strategy: Strategy,
    pub steps: Vec<PipelineStep>,
    /// Flow-style trigger, evaluated against the current instant on every tick
    pub cron_expression: Option<String>,
    pub is_active: bool,
    pub version: u32,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// How the steps of a pipeline are driven
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// One step after another, each seeing the accumulated context
    #[default]
    Sequential,
    /// All steps at once against the original input
    Parallel,
}

/// One configured step of a pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PipelineStep {
    /// Invoke an agent through the agent runner
    Agent {
        id: String,
        agent_id: Uuid,
        role: String,
        /// Replaces the agent's own instructions for this step
        #[serde(default)]
        prompt: Option<String>,
    },
    /// Run a stored code fragment in the sandbox
    Plugin {
        id: String,
        plugin_id: Uuid,
        role: String,
    },
}

impl PipelineStep {
    pub fn id(&self) -> &str {
        match self {
            PipelineStep::Agent { id, .. } | PipelineStep::Plugin { id, .. } => id,
        }
    }

    pub fn role(&self) -> &str {
        match self {
            PipelineStep::Agent { role, .. } | PipelineStep::Plugin { role, .. } => role,
        }
    }
}

/// Step configuration rejected at the pipeline-edit boundary
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StepValidationError {
    #[error("pipeline must have at least one step")]
    Empty,
    #[error("step {0} has an empty id")]
    MissingId(usize),
    #[error("step '{0}' has an empty role")]
    MissingRole(String),
    #[error("step id '{0}' is used more than once")]
    DuplicateId(String),
}

/// Checks the shape of a step list
///
/// Reference checks (agents and plugins exist) need storage and are done by
/// the engine.
pub fn validate_steps(steps: &[PipelineStep]) -> Result<(), StepValidationError> {
    if steps.is_empty() {
        return Err(StepValidationError::Empty);
    }

    let mut seen = HashSet::new();
    for (idx, step) in steps.iter().enumerate() {
        if step.id().trim().is_empty() {
            return Err(StepValidationError::MissingId(idx));
        }
        if step.role().trim().is_empty() {
            return Err(StepValidationError::MissingRole(step.id().to_string()));
        }
        if !seen.insert(step.id()) {
            return Err(StepValidationError::DuplicateId(step.id().to_string()));
        }
    }

    Ok(())
}
