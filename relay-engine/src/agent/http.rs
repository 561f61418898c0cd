//! HTTP agent runner
//!
//! Posts each invocation as JSON to an external runner service and reads back
//! `{text, input_tokens, output_tokens, delegations}`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::debug;

use super::{AgentError, AgentInvocation, AgentReply, AgentRunner, DelegationIntent, TokenUsage};

pub struct HttpAgentRunner {
    client: Client,
    url: String,
}

impl HttpAgentRunner {
    /// Creates a runner posting to `url` with a per-call timeout
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, AgentError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AgentError::Upstream(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct RunnerResponse {
    text: String,
    #[serde(default)]
    input_tokens: u32,
    #[serde(default)]
    output_tokens: u32,
    #[serde(default)]
    delegations: Vec<DelegationIntent>,
}

#[async_trait]
impl AgentRunner for HttpAgentRunner {
    async fn run(&self, invocation: AgentInvocation) -> Result<AgentReply, AgentError> {
        debug!(
            "Invoking agent {} (model {}, depth {})",
            invocation.agent_id, invocation.model, invocation.depth
        );

        let response = self
            .client
            .post(&self.url)
            .json(&invocation)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AgentError::Timeout(e.to_string())
                } else {
                    AgentError::Upstream(format!("Failed to reach agent runner: {}", e))
                }
            })?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let body = response.text().await.unwrap_or_default();
            return Err(AgentError::RateLimited(body));
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AgentError::Upstream(format!(
                "Agent runner returned {}: {}",
                status, body
            )));
        }

        let body: RunnerResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                AgentError::Timeout(e.to_string())
            } else {
                AgentError::Upstream(format!("Invalid agent runner response: {}", e))
            }
        })?;

        Ok(AgentReply {
            text: body.text,
            usage: TokenUsage {
                input_tokens: body.input_tokens,
                output_tokens: body.output_tokens,
            },
            delegations: body.delegations,
        })
    }
}
