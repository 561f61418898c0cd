//! Execution domain types
//!
//! An execution is one run of one pipeline. Status only moves through the
//! transition methods on [`Execution`], which keep `completed_at` and `output`
//! consistent with the status.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;
use uuid::Uuid;

/// Execution record
///
/// Written only by the execution engine; read by the progress notifier,
/// the HTTP API and shared (read-only) links.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Execution {
    pub id: Uuid,
    pub pipeline_id: Uuid,
    pub status: ExecutionStatus,
    pub input: JsonValue,
    pub output: Option<JsonValue>,
    pub current_step_id: Option<String>,
    pub step_results: Vec<StepResult>,
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub share_token: Option<String>,
}

/// Execution lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
    RateLimited,
}

impl ExecutionStatus {
    /// Terminal statuses never change again
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ExecutionStatus::Completed
                | ExecutionStatus::Failed
                | ExecutionStatus::Cancelled
                | ExecutionStatus::RateLimited
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ExecutionStatus::Pending => "pending",
            ExecutionStatus::Running => "running",
            ExecutionStatus::Completed => "completed",
            ExecutionStatus::Failed => "failed",
            ExecutionStatus::Cancelled => "cancelled",
            ExecutionStatus::RateLimited => "rate_limited",
        }
    }
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of step that produced a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    Agent,
    Plugin,
}

/// Output of one finished pipeline step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    pub step_id: String,
    pub role: String,
    pub kind: StepKind,
    pub agent_id: Option<Uuid>,
    pub output: String,
    pub input_tokens: u32,
    pub output_tokens: u32,
    /// Delegation hops started by this step
    pub delegations: u32,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

/// Illegal state machine transition
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("execution {id} cannot move from {from} to {to}")]
pub struct TransitionError {
    pub id: Uuid,
    pub from: ExecutionStatus,
    pub to: ExecutionStatus,
}

impl Execution {
    /// Creates a pending execution for a pipeline
    pub fn new(pipeline_id: Uuid, input: JsonValue) -> Self {
        Self {
            id: Uuid::new_v4(),
            pipeline_id,
            status: ExecutionStatus::Pending,
            input,
            output: None,
            current_step_id: None,
            step_results: Vec::new(),
            error: None,
            started_at: Utc::now(),
            completed_at: None,
            share_token: None,
        }
    }

    /// pending -> running
    pub fn start(&mut self) -> Result<(), TransitionError> {
        self.expect(ExecutionStatus::Pending, ExecutionStatus::Running)?;
        self.status = ExecutionStatus::Running;
        Ok(())
    }

    /// Points `current_step_id` at the step about to run
    pub fn begin_step(&mut self, step_id: &str) -> Result<(), TransitionError> {
        self.expect(ExecutionStatus::Running, ExecutionStatus::Running)?;
        self.current_step_id = Some(step_id.to_string());
        Ok(())
    }

    /// Appends a finished step result
    pub fn record_step(&mut self, result: StepResult) -> Result<(), TransitionError> {
        self.expect(ExecutionStatus::Running, ExecutionStatus::Running)?;
        self.step_results.push(result);
        Ok(())
    }

    /// running -> completed
    pub fn complete(&mut self, output: JsonValue) -> Result<(), TransitionError> {
        self.expect(ExecutionStatus::Running, ExecutionStatus::Completed)?;
        self.status = ExecutionStatus::Completed;
        self.output = Some(output);
        self.current_step_id = None;
        self.completed_at = Some(Utc::now());
        Ok(())
    }

    /// running -> failed
    ///
    /// Also accepted from pending, for runs that die before the first step
    /// (pipeline removed, worker panic). `current_step_id` is left untouched.
    pub fn fail(&mut self, message: impl Into<String>) -> Result<(), TransitionError> {
        if self.status != ExecutionStatus::Pending {
            self.expect(ExecutionStatus::Running, ExecutionStatus::Failed)?;
        }
        self.finish(ExecutionStatus::Failed, Some(message.into()));
        Ok(())
    }

    /// running -> rate_limited
    pub fn rate_limit(&mut self, message: impl Into<String>) -> Result<(), TransitionError> {
        self.expect(ExecutionStatus::Running, ExecutionStatus::RateLimited)?;
        self.finish(ExecutionStatus::RateLimited, Some(message.into()));
        Ok(())
    }

    /// running -> cancelled
    pub fn cancel(&mut self) -> Result<(), TransitionError> {
        self.expect(ExecutionStatus::Running, ExecutionStatus::Cancelled)?;
        self.finish(ExecutionStatus::Cancelled, None);
        Ok(())
    }

    /// Text outputs of every recorded step, in order
    pub fn step_outputs(&self) -> Vec<&str> {
        self.step_results.iter().map(|r| r.output.as_str()).collect()
    }

    fn finish(&mut self, status: ExecutionStatus, error: Option<String>) {
        self.status = status;
        self.error = error;
        self.completed_at = Some(Utc::now());
    }

    fn expect(
        &self,
        required: ExecutionStatus,
        to: ExecutionStatus,
    ) -> Result<(), TransitionError> {
        if self.status == required {
            Ok(())
        } else {
            Err(TransitionError {
                id: self.id,
                from: self.status,
                to,
            })
        }
    }
}
