//! Execution service
//!
//! Drives one execution of one pipeline from `pending` to a terminal status:
//! - Running steps sequentially (context chaining) or in parallel
//! - Invoking agents, resolving their delegations, running plugin steps
//! - Persisting every transition and every step result before moving on
//! - Honouring cancellation requests between steps
//!
//! This service is the only writer of execution records.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use relay_core::domain::execution::{
    Execution, ExecutionStatus, StepKind, StepResult, TransitionError,
};
use relay_core::domain::pipeline::{Pipeline, PipelineStep, Strategy};
use serde_json::{Value as JsonValue, json};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::agent::{AgentError, AgentInvocation, AgentRunner};
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::service::delegation::{DelegationRequest, DelegationService, annotate};
use crate::store::{Store, StoreError};

/// Why a run stopped before completing
enum Halt {
    Cancelled,
    RateLimited(String),
    Failed(String),
    Engine(EngineError),
}

impl From<EngineError> for Halt {
    fn from(err: EngineError) -> Self {
        Halt::Engine(err)
    }
}

impl From<StoreError> for Halt {
    fn from(err: StoreError) -> Self {
        Halt::Engine(err.into())
    }
}

impl From<TransitionError> for Halt {
    fn from(err: TransitionError) -> Self {
        Halt::Engine(err.into())
    }
}

/// Where a step is in the pipeline, and what it gets to read
struct StepContext<'a> {
    execution_id: Uuid,
    input: &'a JsonValue,
    prior_outputs: &'a [String],
    is_last: bool,
    caller_user_id: &'a str,
}

pub struct ExecutionEngine {
    store: Arc<dyn Store>,
    runner: Arc<dyn AgentRunner>,
    delegation: Arc<DelegationService>,
    config: EngineConfig,
    cancellations: Mutex<HashSet<Uuid>>,
}

impl ExecutionEngine {
    pub fn new(
        store: Arc<dyn Store>,
        runner: Arc<dyn AgentRunner>,
        delegation: Arc<DelegationService>,
        config: EngineConfig,
    ) -> Self {
        Self {
            store,
            runner,
            delegation,
            config,
            cancellations: Mutex::new(HashSet::new()),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Creates a pending execution for an active pipeline
    pub async fn create_execution(
        &self,
        pipeline_id: Uuid,
        input: JsonValue,
    ) -> Result<Execution, EngineError> {
        let pipeline = self
            .store
            .find_pipeline(pipeline_id)
            .await?
            .ok_or_else(|| EngineError::not_found("pipeline", pipeline_id))?;

        if !pipeline.is_active {
            return Err(EngineError::Validation(format!(
                "pipeline '{}' is not active",
                pipeline.name
            )));
        }

        let execution = Execution::new(pipeline.id, input);
        self.store.insert_execution(&execution).await?;

        info!(
            "Execution {} created for pipeline '{}' (v{})",
            execution.id, pipeline.name, pipeline.version
        );

        Ok(execution)
    }

    pub async fn get_execution(&self, id: Uuid) -> Result<Execution, EngineError> {
        self.store
            .find_execution(id)
            .await?
            .ok_or_else(|| EngineError::not_found("execution", id))
    }

    pub async fn list_executions(&self, pipeline_id: Uuid) -> Result<Vec<Execution>, EngineError> {
        self.store
            .find_pipeline(pipeline_id)
            .await?
            .ok_or_else(|| EngineError::not_found("pipeline", pipeline_id))?;

        Ok(self.store.list_executions_for_pipeline(pipeline_id).await?)
    }

    /// Runs a pending execution to a terminal status
    ///
    /// Step failures end in a terminal status and still return `Ok`. `Err` is
    /// reserved for the record itself being unreadable or unwritable.
    pub async fn run(&self, execution_id: Uuid) -> Result<Execution, EngineError> {
        let mut execution = self.get_execution(execution_id).await?;

        let pipeline = match self.store.find_pipeline(execution.pipeline_id).await? {
            Some(pipeline) => pipeline,
            None => {
                execution.fail(format!("Pipeline {} no longer exists", execution.pipeline_id))?;
                self.store.save_execution(&execution).await?;
                return Ok(execution);
            }
        };

        execution.start()?;
        self.store.save_execution(&execution).await?;
        info!(
            "Execution {} running pipeline '{}' ({} steps, {:?})",
            execution.id,
            pipeline.name,
            pipeline.steps.len(),
            pipeline.strategy
        );

        let outcome = match pipeline.strategy {
            Strategy::Sequential => self.run_sequential(&pipeline, &mut execution).await,
            Strategy::Parallel => self.run_parallel(&pipeline, &mut execution).await,
        };

        // Cleared only once the terminal status is stored, so a cancel
        // request racing the end of the run sees it and backs out
        let settled = self.settle(&mut execution, outcome).await;
        self.clear_cancel(execution.id);
        settled?;

        info!("Execution {} finished: {}", execution.id, execution.status);
        Ok(execution)
    }

    async fn settle(
        &self,
        execution: &mut Execution,
        outcome: Result<JsonValue, Halt>,
    ) -> Result<(), EngineError> {
        match outcome {
            Ok(output) => execution.complete(output)?,
            Err(Halt::Cancelled) => execution.cancel()?,
            Err(Halt::RateLimited(message)) => execution.rate_limit(message)?,
            Err(Halt::Failed(message)) => execution.fail(message)?,
            Err(Halt::Engine(err)) => {
                warn!("Execution {} aborted: {}", execution.id, err);
                if execution.fail(err.to_string()).is_ok() {
                    if let Err(save_err) = self.store.save_execution(execution).await {
                        warn!(
                            "Failed to record abort of execution {}: {}",
                            execution.id, save_err
                        );
                    }
                }
                return Err(err);
            }
        }

        self.store.save_execution(execution).await?;
        Ok(())
    }

    /// Asks a running execution to stop before its next step
    pub async fn request_cancel(&self, execution_id: Uuid) -> Result<(), EngineError> {
        let execution = self.get_execution(execution_id).await?;

        if execution.status != ExecutionStatus::Running {
            return Err(EngineError::InvalidState(format!(
                "execution {} is {}, only running executions can be cancelled",
                execution_id, execution.status
            )));
        }

        self.lock_cancellations().insert(execution_id);

        // The run may have settled between the read and the insert
        let current = self.get_execution(execution_id).await?;
        if current.status.is_terminal() {
            self.clear_cancel(execution_id);
            return Err(EngineError::InvalidState(format!(
                "execution {} is {}, only running executions can be cancelled",
                execution_id, current.status
            )));
        }

        info!("Cancellation requested for execution {}", execution_id);
        Ok(())
    }

    /// Creates (or replaces) a read-only share token
    pub async fn share(&self, execution_id: Uuid) -> Result<String, EngineError> {
        let token = Uuid::new_v4().simple().to_string();
        if !self
            .store
            .set_share_token(execution_id, Some(token.clone()))
            .await?
        {
            return Err(EngineError::not_found("execution", execution_id));
        }
        Ok(token)
    }

    pub async fn unshare(&self, execution_id: Uuid) -> Result<(), EngineError> {
        if !self.store.set_share_token(execution_id, None).await? {
            return Err(EngineError::not_found("execution", execution_id));
        }
        Ok(())
    }

    pub async fn find_shared(&self, token: &str) -> Result<Execution, EngineError> {
        self.store
            .find_execution_by_share_token(token)
            .await?
            .ok_or_else(|| EngineError::NotFound("shared execution".to_string()))
    }

    /// Marks an execution whose run task died as failed
    ///
    /// No-op when the execution already reached a terminal status.
    pub async fn fail_orphaned(
        &self,
        execution_id: Uuid,
        message: impl Into<String>,
    ) -> Result<(), EngineError> {
        let mut execution = self.get_execution(execution_id).await?;
        self.clear_cancel(execution_id);

        if execution.status.is_terminal() {
            return Ok(());
        }

        execution.fail(message)?;
        self.store.save_execution(&execution).await?;
        warn!("Execution {} marked failed after its run task died", execution_id);
        Ok(())
    }

    async fn run_sequential(
        &self,
        pipeline: &Pipeline,
        execution: &mut Execution,
    ) -> Result<JsonValue, Halt> {
        let last = pipeline.steps.len().saturating_sub(1);
        let mut outputs: Vec<String> = Vec::with_capacity(pipeline.steps.len());

        for (idx, step) in pipeline.steps.iter().enumerate() {
            if self.cancel_requested(execution.id) {
                return Err(Halt::Cancelled);
            }

            execution.begin_step(step.id())?;
            self.store.save_execution(execution).await?;
            debug!(
                "Execution {} step {}/{} '{}'",
                execution.id,
                idx + 1,
                pipeline.steps.len(),
                step.id()
            );

            let ctx = StepContext {
                execution_id: execution.id,
                input: &execution.input,
                prior_outputs: &outputs,
                is_last: idx == last,
                caller_user_id: &pipeline.owner_id,
            };
            let result = self.run_step(step, &ctx).await?;

            outputs.push(result.output.clone());
            execution.record_step(result)?;
            self.store.save_execution(execution).await?;
        }

        if self.cancel_requested(execution.id) {
            return Err(Halt::Cancelled);
        }

        let final_role = pipeline.steps.last().map(|s| s.role()).unwrap_or_default();
        let final_text = outputs.last().map(String::as_str).unwrap_or_default();
        Ok(JsonValue::String(shape_final_output(final_text, final_role)))
    }

    async fn run_parallel(
        &self,
        pipeline: &Pipeline,
        execution: &mut Execution,
    ) -> Result<JsonValue, Halt> {
        if self.cancel_requested(execution.id) {
            return Err(Halt::Cancelled);
        }

        let last = pipeline.steps.len().saturating_sub(1);
        let no_context: Vec<String> = Vec::new();
        let execution_id = execution.id;
        let input = execution.input.clone();

        let runs = pipeline.steps.iter().enumerate().map(|(idx, step)| {
            let ctx = StepContext {
                execution_id,
                input: &input,
                prior_outputs: &no_context,
                is_last: idx == last,
                caller_user_id: &pipeline.owner_id,
            };
            async move { self.run_step(step, &ctx).await }
        });
        let results = futures::future::join_all(runs).await;

        let mut outputs = Vec::with_capacity(results.len());
        for (step, result) in pipeline.steps.iter().zip(results) {
            match result {
                Ok(result) => {
                    outputs.push(JsonValue::String(result.output.clone()));
                    execution.record_step(result)?;
                }
                Err(halt) => {
                    execution.begin_step(step.id())?;
                    self.store.save_execution(execution).await?;
                    return Err(halt);
                }
            }
        }
        self.store.save_execution(execution).await?;

        if self.cancel_requested(execution.id) {
            return Err(Halt::Cancelled);
        }

        Ok(JsonValue::Array(outputs))
    }

    async fn run_step(&self, step: &PipelineStep, ctx: &StepContext<'_>) -> Result<StepResult, Halt> {
        match step {
            PipelineStep::Agent {
                id,
                agent_id,
                role,
                prompt,
            } => {
                self.run_agent_step(id, *agent_id, role, prompt.as_deref(), ctx)
                    .await
            }
            PipelineStep::Plugin {
                id,
                plugin_id,
                role,
            } => self.run_plugin_step(id, *plugin_id, role, ctx).await,
        }
    }

    async fn run_agent_step(
        &self,
        step_id: &str,
        agent_id: Uuid,
        role: &str,
        prompt_override: Option<&str>,
        ctx: &StepContext<'_>,
    ) -> Result<StepResult, Halt> {
        let started_at = Utc::now();

        let agent = match self.store.find_agent(agent_id).await? {
            Some(agent) if agent.enabled => agent,
            Some(agent) => {
                return Err(Halt::Failed(format!(
                    "Step '{}' failed: agent '{}' is disabled",
                    step_id, agent.name
                )));
            }
            None => {
                return Err(Halt::Failed(format!(
                    "Step '{}' failed: agent {} not found",
                    step_id, agent_id
                )));
            }
        };

        let base = prompt_override.unwrap_or(&agent.instructions);
        let (instructions, max_tokens) = if ctx.is_last {
            (
                final_instructions(base, role, self.config.final_sentence_max_words),
                self.config.final_max_tokens,
            )
        } else {
            (base.to_string(), self.config.intermediate_max_tokens)
        };

        let invocation = AgentInvocation {
            agent_id: agent.id,
            model: agent.model.clone(),
            instructions,
            prompt: compose_prompt(ctx.prior_outputs, ctx.input),
            max_tokens,
            depth: 0,
        };

        let reply = self.runner.run(invocation).await.map_err(|err| match err {
            AgentError::RateLimited(_) => {
                Halt::RateLimited(format!("Step '{}' was rate limited: {}", step_id, err))
            }
            other => Halt::Failed(format!("Step '{}' failed: {}", step_id, other)),
        })?;

        let delegations = reply.delegations.len() as u32;
        let mut output = reply.text;
        for intent in reply.delegations {
            debug!(
                "Execution {} step '{}' delegating to {}",
                ctx.execution_id, step_id, intent.to_agent_id
            );
            let text = self
                .delegation
                .delegate(DelegationRequest {
                    from_agent_id: agent.id,
                    to_agent_id: intent.to_agent_id,
                    caller_user_id: ctx.caller_user_id.to_string(),
                    message: intent.message,
                    depth: 0,
                })
                .await;
            output.push_str(&annotate(intent.to_agent_id, &text));
        }

        Ok(StepResult {
            step_id: step_id.to_string(),
            role: role.to_string(),
            kind: StepKind::Agent,
            agent_id: Some(agent.id),
            output,
            input_tokens: reply.usage.input_tokens,
            output_tokens: reply.usage.output_tokens,
            delegations,
            started_at,
            completed_at: Utc::now(),
        })
    }

    async fn run_plugin_step(
        &self,
        step_id: &str,
        plugin_id: Uuid,
        role: &str,
        ctx: &StepContext<'_>,
    ) -> Result<StepResult, Halt> {
        let started_at = Utc::now();

        let plugin = match self.store.find_plugin(plugin_id).await? {
            Some(plugin) if plugin.enabled => plugin,
            Some(plugin) => {
                return Err(Halt::Failed(format!(
                    "Step '{}' failed: plugin '{}' is disabled",
                    step_id, plugin.name
                )));
            }
            None => {
                return Err(Halt::Failed(format!(
                    "Step '{}' failed: plugin {} not found",
                    step_id, plugin_id
                )));
            }
        };

        let input = json!({
            "input": ctx.input,
            "context": ctx.prior_outputs,
        });
        let result = relay_lua::execute(&plugin.code, input).await;

        if !result.success {
            return Err(Halt::Failed(format!(
                "Step '{}' failed: plugin '{}': {}",
                step_id,
                plugin.name,
                result.error.unwrap_or_else(|| "unknown error".to_string())
            )));
        }

        let output = match result.output {
            Some(JsonValue::String(text)) => text,
            Some(other) => other.to_string(),
            None => String::new(),
        };

        Ok(StepResult {
            step_id: step_id.to_string(),
            role: role.to_string(),
            kind: StepKind::Plugin,
            agent_id: None,
            output,
            input_tokens: 0,
            output_tokens: 0,
            delegations: 0,
            started_at,
            completed_at: Utc::now(),
        })
    }

    fn cancel_requested(&self, execution_id: Uuid) -> bool {
        self.lock_cancellations().contains(&execution_id)
    }

    fn clear_cancel(&self, execution_id: Uuid) {
        self.lock_cancellations().remove(&execution_id);
    }

    fn lock_cancellations(&self) -> std::sync::MutexGuard<'_, HashSet<Uuid>> {
        self.cancellations.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Renders the execution input as step text
pub fn input_text(input: &JsonValue) -> String {
    match input {
        JsonValue::String(text) => text.clone(),
        JsonValue::Null => String::new(),
        other => other.to_string(),
    }
}

/// Prior step outputs, one per line, followed by the original input
pub fn compose_prompt(prior_outputs: &[String], input: &JsonValue) -> String {
    let mut parts: Vec<String> = prior_outputs.to_vec();
    parts.push(input_text(input));
    parts.join("\n")
}

/// Instructions for the last step, carrying the single-sentence constraint
pub fn final_instructions(base: &str, role: &str, max_words: u32) -> String {
    let constraint = format!(
        "Respond with a single sentence of at most {} words that begins with \"{}: \".",
        max_words, role
    );
    if base.trim().is_empty() {
        constraint
    } else {
        format!("{}\n\n{}", base.trim_end(), constraint)
    }
}

/// Keeps the first sentence of `text` and makes sure it starts with `"<role>: "`
pub fn shape_final_output(text: &str, role: &str) -> String {
    let prefix = format!("{}: ", role);
    let trimmed = text.trim();
    let body = trimmed.strip_prefix(prefix.as_str()).unwrap_or(trimmed);

    let sentence = first_sentence(body);
    format!("{}{}", prefix, sentence)
}

fn first_sentence(text: &str) -> &str {
    let text = text.lines().find(|l| !l.trim().is_empty()).unwrap_or_default().trim();

    let mut chars = text.char_indices().peekable();
    while let Some((idx, c)) = chars.next() {
        if matches!(c, '.' | '!' | '?') {
            match chars.peek() {
                None => return text,
                Some((_, next)) if next.is_whitespace() => return &text[..idx + c.len_utf8()],
                _ => {}
            }
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::EchoAgentRunner;
    use crate::store::ExecutionStore;
    use crate::store::testing::FaultyStore;

    #[tokio::test]
    async fn test_cancel_racing_completion_leaves_no_request() {
        let store = Arc::new(FaultyStore::default());
        let dyn_store: Arc<dyn Store> = store.clone();
        let runner = Arc::new(EchoAgentRunner);
        let delegation = Arc::new(DelegationService::new(dyn_store.clone(), runner.clone()));
        let engine = ExecutionEngine::new(dyn_store, runner, delegation, EngineConfig::default());

        let mut execution = Execution::new(Uuid::new_v4(), json!("brief"));
        execution.start().unwrap();
        let running = execution.clone();
        execution.complete(json!("done")).unwrap();
        store.inner.insert_execution(&execution).await.unwrap();

        // First read still sees the run in progress
        store.serve_stale(running);

        let result = engine.request_cancel(execution.id).await;
        assert!(matches!(result, Err(EngineError::InvalidState(_))));
        assert!(!engine.cancel_requested(execution.id));
    }

    #[test]
    fn test_compose_prompt_appends_input_after_context() {
        let prior = vec!["research notes".to_string(), "draft copy".to_string()];
        let prompt = compose_prompt(&prior, &json!("launch copy for product X"));
        assert_eq!(prompt, "research notes\ndraft copy\nlaunch copy for product X");

        assert_eq!(compose_prompt(&[], &json!({"a": 1})), r#"{"a":1}"#);
    }

    #[test]
    fn test_final_instructions_carry_constraint() {
        let text = final_instructions("You review copy.", "Reviewer", 30);
        assert!(text.starts_with("You review copy."));
        assert!(text.contains("single sentence of at most 30 words"));
        assert!(text.contains("\"Reviewer: \""));
    }

    #[test]
    fn test_shape_final_output() {
        assert_eq!(
            shape_final_output("Looks good. Ship it after legal review.", "Reviewer"),
            "Reviewer: Looks good."
        );
        assert_eq!(
            shape_final_output("Reviewer: Approved as written! Nice.", "Reviewer"),
            "Reviewer: Approved as written!"
        );
        assert_eq!(
            shape_final_output("Version 2.5 is ready", "Writer"),
            "Writer: Version 2.5 is ready"
        );
        assert_eq!(
            shape_final_output("\n\nFirst line.\nSecond line.", "Reviewer"),
            "Reviewer: First line."
        );
    }
}
