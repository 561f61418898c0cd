//! Delegation service
//!
//! Lets one agent hand a sub-task to another and get text back. The depth of
//! the chain travels as an explicit argument on every call. Past
//! [`MAX_DELEGATION_DEPTH`] the call is refused with plain text instead of an
//! error, so a runaway chain degrades instead of failing the pipeline.

use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use relay_core::domain::delegation::Delegation;
use tracing::{info, warn};
use uuid::Uuid;

use crate::agent::{AgentInvocation, AgentRunner};
use crate::store::Store;

/// Longest allowed chain of agent-to-agent hand-offs
pub const MAX_DELEGATION_DEPTH: u32 = 3;

/// Token budget for delegated calls
const DELEGATION_MAX_TOKENS: u32 = 1024;

#[derive(Debug, Clone)]
pub struct DelegationRequest {
    pub from_agent_id: Uuid,
    pub to_agent_id: Uuid,
    pub caller_user_id: String,
    pub message: String,
    /// Depth of the caller; 0 when an agent running a pipeline step delegates
    pub depth: u32,
}

pub struct DelegationService {
    store: Arc<dyn Store>,
    runner: Arc<dyn AgentRunner>,
}

impl DelegationService {
    pub fn new(store: Arc<dyn Store>, runner: Arc<dyn AgentRunner>) -> Self {
        Self { store, runner }
    }

    /// Runs a delegation and returns the text the calling agent sees
    ///
    /// Never fails: refusals, missing or disabled targets and upstream errors
    /// all come back as descriptive text. A record is written only when the
    /// target is actually called, and it is updated exactly once.
    pub fn delegate(&self, request: DelegationRequest) -> BoxFuture<'_, String> {
        async move {
            if request.depth >= MAX_DELEGATION_DEPTH {
                info!(
                    "Refusing delegation {} -> {} at depth {}",
                    request.from_agent_id, request.to_agent_id, request.depth
                );
                return format!(
                    "Delegation refused: the maximum delegation depth of {} has been reached. \
                     Answer the request yourself.",
                    MAX_DELEGATION_DEPTH
                );
            }

            let target = match self.store.find_agent(request.to_agent_id).await {
                Ok(Some(agent)) if agent.enabled => agent,
                Ok(Some(agent)) => {
                    return format!(
                        "Delegation failed: agent '{}' is disabled and cannot take requests.",
                        agent.name
                    );
                }
                Ok(None) => {
                    return format!(
                        "Delegation failed: agent {} does not exist.",
                        request.to_agent_id
                    );
                }
                Err(e) => {
                    warn!("Failed to load delegation target {}: {}", request.to_agent_id, e);
                    return format!(
                        "Delegation failed: agent {} could not be loaded: {}",
                        request.to_agent_id, e
                    );
                }
            };

            let mut record = Delegation::pending(
                request.from_agent_id,
                target.id,
                request.caller_user_id.clone(),
                request.message.clone(),
                request.depth,
            );
            if let Err(e) = self.store.insert_delegation(&record).await {
                warn!("Failed to record delegation to {}: {}", target.id, e);
                return format!("Delegation failed: could not record the request: {}", e);
            }

            let next_depth = request.depth + 1;
            let invocation = AgentInvocation {
                agent_id: target.id,
                model: target.model.clone(),
                instructions: target.instructions.clone(),
                prompt: request.message.clone(),
                max_tokens: DELEGATION_MAX_TOKENS,
                depth: next_depth,
            };

            let text = match self.runner.run(invocation).await {
                Ok(reply) => {
                    let mut text = reply.text;
                    for intent in reply.delegations {
                        let nested = self
                            .delegate(DelegationRequest {
                                from_agent_id: target.id,
                                to_agent_id: intent.to_agent_id,
                                caller_user_id: request.caller_user_id.clone(),
                                message: intent.message,
                                depth: next_depth,
                            })
                            .await;
                        text.push_str(&annotate(intent.to_agent_id, &nested));
                    }
                    record.complete(text.clone());
                    text
                }
                Err(e) => {
                    let text = format!("Delegation to '{}' failed: {}", target.name, e);
                    record.fail(text.clone());
                    text
                }
            };

            if let Err(e) = self.store.save_delegation(&record).await {
                warn!("Failed to update delegation {}: {}", record.id, e);
            }

            info!(
                "Delegation {} ({} -> {}, depth {}) {}",
                record.id,
                record.from_agent_id,
                record.to_agent_id,
                record.depth,
                record.status.as_str()
            );

            text
        }
        .boxed()
    }
}

/// Renders a delegated answer for inclusion in the delegating agent's output
pub fn annotate(agent_id: Uuid, text: &str) -> String {
    format!("\n[delegated to {}] {}", agent_id, text)
}
