//! Agent runner
//!
//! The language-model call is an opaque collaborator: it takes a prompt and a
//! model id and returns text plus token counts, or fails. The engine only
//! sees the [`AgentRunner`] trait.

mod echo;
mod http;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub use echo::EchoAgentRunner;
pub use http::HttpAgentRunner;

/// One call to an agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentInvocation {
    pub agent_id: Uuid,
    pub model: String,
    /// System prompt, including any step constraint
    pub instructions: String,
    pub prompt: String,
    pub max_tokens: u32,
    /// Delegation depth this call runs at; 0 for pipeline steps
    pub depth: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// Request from an agent to hand a sub-task to another agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DelegationIntent {
    pub to_agent_id: Uuid,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentReply {
    pub text: String,
    #[serde(default)]
    pub usage: TokenUsage,
    #[serde(default)]
    pub delegations: Vec<DelegationIntent>,
}

impl AgentReply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            usage: TokenUsage::default(),
            delegations: Vec::new(),
        }
    }
}

/// Agent call failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AgentError {
    /// Upstream throttling; executions end `rate_limited`
    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("agent call timed out: {0}")]
    Timeout(String),

    /// Any other upstream failure; the text is kept verbatim
    #[error("{0}")]
    Upstream(String),
}

/// Service trait for invoking agents
#[async_trait]
pub trait AgentRunner: Send + Sync {
    async fn run(&self, invocation: AgentInvocation) -> Result<AgentReply, AgentError>;
}
